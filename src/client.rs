use std::collections::HashMap;
use std::path::Path;

use crate::error::Result;
use crate::operations::{download, list, remove, upload, walk};
use crate::remote_fs::{RemoteFs, SessionFs};
use crate::types::{FileMetadata, RemoteTree, TransferResult};

/// SFTP client for performing file operations on a remote server
///
/// Wraps a [`RemoteFs`] handle and adds tree walking, bulk upload and path
/// normalization on top of it. Operations without a helper here go straight
/// to the handle through [`SftpClient::inner`].
#[derive(Debug)]
pub struct SftpClient<F: RemoteFs = SessionFs> {
    fs: F,
}

impl<F: RemoteFs> SftpClient<F> {
    /// Creates a client over an open remote filesystem handle
    pub fn new(fs: F) -> Self {
        Self { fs }
    }

    /// The wrapped handle
    pub fn inner(&self) -> &F {
        &self.fs
    }

    /// Unwraps the client, returning the handle
    pub fn into_inner(self) -> F {
        self.fs
    }

    /// Closes the SFTP client and releases resources
    ///
    /// # Example
    ///
    /// ```ignore
    /// client.close().await?;
    /// ```
    pub async fn close(self) -> Result<()> {
        self.fs.close().await
    }

    /// Lists the contents of a remote directory
    ///
    /// # Arguments
    ///
    /// * `remote_dir` - Path to the remote directory
    ///
    /// # Returns
    ///
    /// Returns a vector of `FileMetadata` for every entry in the directory
    ///
    /// # Example
    ///
    /// ```ignore
    /// let files = client.ls("/remote/path").await?;
    /// for file in files {
    ///     println!("{}: {} bytes", file.path, file.size.unwrap_or(0));
    /// }
    /// ```
    pub async fn ls(&self, remote_dir: &str) -> Result<Vec<FileMetadata>> {
        list::ls(&self.fs, remote_dir).await
    }

    /// Recursively collects directories and files below a remote directory
    ///
    /// # Arguments
    ///
    /// * `root_dir` - Remote directory to start from
    /// * `max_depth` - Deepest directory level to descend into, `0` for no limit
    ///
    /// # Returns
    ///
    /// Returns a `RemoteTree` whose directories are listed parent first
    ///
    /// # Example
    ///
    /// ```ignore
    /// let tree = client.walk_files("/var/log", 2).await?;
    /// for file in &tree.files {
    ///     println!("{file}");
    /// }
    /// ```
    pub async fn walk_files(&self, root_dir: &str, max_depth: usize) -> Result<RemoteTree> {
        walk::walk_files(&self.fs, root_dir, max_depth).await
    }

    /// Uploads a local file into a remote directory
    ///
    /// # Arguments
    ///
    /// * `local_path` - Path to the local file
    /// * `remote_dir` - Remote directory receiving the file
    /// * `filename` - Remote file name, defaults to the local file name
    ///
    /// # Example
    ///
    /// ```ignore
    /// let result = client.upload_file(Path::new("/local/app.tar.gz"), "/opt/releases", None).await;
    /// if !result.is_success() {
    ///     eprintln!("upload failed: {}", result.detail());
    /// }
    /// ```
    pub async fn upload_file(
        &self,
        local_path: &Path,
        remote_dir: &str,
        filename: Option<&str>,
    ) -> TransferResult {
        upload::upload_file(&self.fs, local_path, remote_dir, filename).await
    }

    /// Uploads a local file to a remote path
    ///
    /// When `target_is_dir` is set the file is placed inside `remote_path`
    /// under its local name.
    pub async fn put(&self, local_path: &Path, remote_path: &str, target_is_dir: bool) -> TransferResult {
        upload::put(&self.fs, local_path, remote_path, target_is_dir).await
    }

    /// Writes a string to a remote file
    pub async fn upload_text(&self, text: &str, remote_path: &str) -> TransferResult {
        upload::upload_text(&self.fs, text, remote_path).await
    }

    /// Uploads several local files into one remote directory
    ///
    /// # Arguments
    ///
    /// * `local_files` - Local files to upload, in order
    /// * `remote_dir` - Remote directory receiving all files
    /// * `filename_map` - Renames by local file name; unmapped files keep their name
    ///
    /// # Returns
    ///
    /// Returns one `TransferResult` per file. Earlier uploads stay in place
    /// when a later one fails.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let renames = HashMap::from([("a.txt".to_string(), "b.txt".to_string())]);
    /// let results = client.upload_files(&["/local/a.txt", "/local/c.txt"], "/remote", &renames).await;
    /// ```
    pub async fn upload_files<P: AsRef<Path>>(
        &self,
        local_files: &[P],
        remote_dir: &str,
        filename_map: &HashMap<String, String>,
    ) -> Vec<TransferResult> {
        upload::upload_files(&self.fs, local_files, remote_dir, filename_map).await
    }

    /// Downloads a file from the remote server to local storage
    ///
    /// # Arguments
    ///
    /// * `remote_path` - Path to the remote file
    /// * `local_path` - Local destination path; its parent directory must exist
    ///
    /// # Example
    ///
    /// ```ignore
    /// let result = client.download("/remote/file.txt", Path::new("/local/file.txt")).await;
    /// ```
    pub async fn download(&self, remote_path: &str, local_path: &Path) -> TransferResult {
        download::download(&self.fs, remote_path, local_path).await
    }

    /// Downloads a remote file into a local directory or path
    ///
    /// An existing local directory receives the file under its remote name,
    /// `None` means the current directory.
    pub async fn get(&self, remote_path: &str, local_path: Option<&Path>) -> TransferResult {
        download::get(&self.fs, remote_path, local_path).await
    }

    /// Reads a remote text file as lines, dropping invalid UTF-8
    pub async fn download_lines(&self, remote_path: &str) -> Result<Vec<String>> {
        download::download_lines(&self.fs, remote_path).await
    }

    /// Size of a remote file in bytes
    pub async fn file_size(&self, remote_path: &str) -> Result<u64> {
        download::file_size(&self.fs, remote_path).await
    }

    /// Removes a remote file
    pub async fn delete(&self, remote_path: &str) -> TransferResult {
        remove::delete(&self.fs, remote_path).await
    }
}
