use std::collections::HashMap;
use std::path::Path;
use std::time::Instant;
use tracing::{error, info, warn};

use crate::path;
use crate::remote_fs::RemoteFs;
use crate::types::TransferResult;

/// Failure detail reported when the local side of an upload is missing
pub const LOCAL_FILE_NOT_EXISTS: &str = "local file not exists";

/// Uploads a local file into a remote directory
///
/// The remote path is `remote_dir/filename`, where `filename` defaults to
/// the local file name. Nothing is sent to the server when the local file
/// is missing.
///
/// # Returns
///
/// - `Completed` with the number of bytes sent
/// - `Failed` with detail [`LOCAL_FILE_NOT_EXISTS`] if `local_path` does not exist
/// - `Failed` with the error text if the remote side fails
pub async fn upload_file<F: RemoteFs>(
    fs: &F,
    local_path: &Path,
    remote_dir: &str,
    filename: Option<&str>,
) -> TransferResult {
    let local = local_path.display().to_string();
    if !local_path.exists() {
        warn!("Upload skipped, local file not found: {:?}", local_path);
        return TransferResult::failed(local, remote_dir, LOCAL_FILE_NOT_EXISTS);
    }

    let filename = match filename {
        Some(filename) => filename.to_string(),
        None => match local_path.file_name() {
            Some(name) => name.to_string_lossy().into_owned(),
            None => return TransferResult::failed(local, remote_dir, "local path has no file name"),
        },
    };
    send(fs, local_path, path::join(remote_dir, &filename)).await
}

/// Uploads a local file to a remote path
///
/// With `target_is_dir` the remote path names a directory and the file keeps
/// its local name inside it; otherwise the remote path is the destination
/// file itself.
pub async fn put<F: RemoteFs>(
    fs: &F,
    local_path: &Path,
    remote_path: &str,
    target_is_dir: bool,
) -> TransferResult {
    if target_is_dir {
        return upload_file(fs, local_path, remote_path, None).await;
    }
    if !local_path.exists() {
        warn!("Upload skipped, local file not found: {:?}", local_path);
        return TransferResult::failed(
            local_path.display().to_string(),
            remote_path,
            LOCAL_FILE_NOT_EXISTS,
        );
    }
    send(fs, local_path, path::normalize(remote_path)).await
}

/// Writes the UTF-8 bytes of `text` to a remote file
pub async fn upload_text<F: RemoteFs>(fs: &F, text: &str, remote_path: &str) -> TransferResult {
    let remote_path = path::normalize(remote_path);
    match fs.write(&remote_path, text.as_bytes()).await {
        Ok(()) => {
            info!("Wrote {} bytes of text to {:?}", text.len(), remote_path);
            TransferResult::completed("<text>", remote_path, text.len() as u64)
        }
        Err(e) => {
            error!("Error writing text to {:?}: {}", remote_path, e);
            TransferResult::failed("<text>", remote_path, e)
        }
    }
}

/// Uploads several local files into one remote directory
///
/// `filename_map` renames files by local file name; names not in the map are
/// kept. Files are uploaded one after another and a failure does not stop or
/// undo the others.
///
/// # Returns
///
/// One `TransferResult` per input file, in input order.
pub async fn upload_files<F: RemoteFs, P: AsRef<Path>>(
    fs: &F,
    local_files: &[P],
    remote_dir: &str,
    filename_map: &HashMap<String, String>,
) -> Vec<TransferResult> {
    let mut results = Vec::with_capacity(local_files.len());
    for local_file in local_files {
        let local_file = local_file.as_ref();
        let renamed = local_file
            .file_name()
            .and_then(|name| filename_map.get(&*name.to_string_lossy()))
            .map(String::as_str);
        results.push(upload_file(fs, local_file, remote_dir, renamed).await);
    }
    results
}

async fn send<F: RemoteFs>(fs: &F, local_path: &Path, remote_path: String) -> TransferResult {
    let upload_time = Instant::now();
    let local = local_path.display().to_string();
    match fs.put(local_path, &remote_path).await {
        Ok(file_size) => {
            info!(
                "File {:?} uploaded to {:?}. Time taken {:?}",
                local,
                remote_path,
                upload_time.elapsed(),
            );
            TransferResult::completed(local, remote_path, file_size)
        }
        Err(e) => {
            error!("Error uploading {:?} to {:?}: {}", local, remote_path, e);
            TransferResult::failed(local, remote_path, e)
        }
    }
}
