use crate::error::Result;
use crate::path;
use crate::remote_fs::RemoteFs;
use crate::types::FileMetadata;

/// Lists the contents of a remote directory
///
/// Returns the metadata of every entry (files, directories and anything
/// else) in listing order. Each entry is stat'ed individually, so symlinks
/// report the type of their target.
///
/// # Errors
///
/// Returns an error if the directory cannot be listed or an entry cannot
/// be stat'ed.
pub async fn ls<F: RemoteFs>(fs: &F, remote_dir: &str) -> Result<Vec<FileMetadata>> {
    let remote_dir = path::normalize(remote_dir);
    let mut file_list = Vec::new();
    for name in fs.list_dir(&remote_dir).await? {
        file_list.push(fs.stat(&path::join(&remote_dir, &name)).await?);
    }
    Ok(file_list)
}
