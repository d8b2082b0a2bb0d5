use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{error, info};

use crate::error::{Error, Result};
use crate::path;
use crate::remote_fs::RemoteFs;
use crate::types::TransferResult;

/// Downloads a remote file to a local path
///
/// Missing parent directories of `local_path` are not created; the download
/// fails instead.
///
/// # Returns
///
/// - `Completed` with the number of bytes received
/// - `Failed` with the error text if the remote file cannot be read or the
///   local file cannot be written
pub async fn download<F: RemoteFs>(fs: &F, remote_path: &str, local_path: &Path) -> TransferResult {
    let download_time = Instant::now();
    let remote_path = path::normalize(remote_path);
    let local = local_path.display().to_string();
    match fs.get(&remote_path, local_path).await {
        Ok(file_size) => {
            info!(
                "File {:?} downloaded. Time taken {:?}",
                remote_path,
                download_time.elapsed(),
            );
            TransferResult::completed(remote_path, local, file_size)
        }
        Err(e) => {
            error!("Error downloading {:?} to {:?}: {}", remote_path, local, e);
            TransferResult::failed(remote_path, local, e)
        }
    }
}

/// Downloads a remote file, choosing the local file name when needed
///
/// An existing local directory receives the file under its remote name; no
/// local path means the current directory.
pub async fn get<F: RemoteFs>(fs: &F, remote_path: &str, local_path: Option<&Path>) -> TransferResult {
    let Some(name) = path::file_name(remote_path) else {
        return TransferResult::failed(remote_path, "", "remote path has no file name");
    };
    let target = match local_path {
        Some(local) if local.is_dir() => local.join(name),
        Some(local) => local.to_path_buf(),
        None => PathBuf::from(name),
    };
    download(fs, remote_path, &target).await
}

/// Reads a remote text file and splits it into lines
///
/// Bytes that are not valid UTF-8 are dropped.
///
/// # Errors
///
/// Returns an error if the remote file cannot be opened or read.
pub async fn download_lines<F: RemoteFs>(fs: &F, remote_path: &str) -> Result<Vec<String>> {
    let content = fs.read(&path::normalize(remote_path)).await?;
    let mut text = String::with_capacity(content.len());
    for chunk in content.utf8_chunks() {
        text.push_str(chunk.valid());
    }
    Ok(text.lines().map(str::to_string).collect())
}

/// Size of a remote file in bytes
///
/// # Errors
///
/// Returns an error if the path cannot be stat'ed or the server does not
/// report a size for it.
pub async fn file_size<F: RemoteFs>(fs: &F, remote_path: &str) -> Result<u64> {
    let remote_path = path::normalize(remote_path);
    let metadata = fs.stat(&remote_path).await?;
    metadata.size.ok_or(Error::SizeUnavailable(remote_path))
}
