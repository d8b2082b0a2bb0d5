use tracing::{error, info};

use crate::path;
use crate::remote_fs::RemoteFs;
use crate::types::TransferResult;

/// Removes a remote file
pub async fn delete<F: RemoteFs>(fs: &F, remote_path: &str) -> TransferResult {
    let remote_path = path::normalize(remote_path);
    match fs.remove(&remote_path).await {
        Ok(()) => {
            info!("Remote file removed: {:?}", remote_path);
            TransferResult::completed(remote_path, "", 0)
        }
        Err(e) => {
            error!("Error removing {:?}: {}", remote_path, e);
            TransferResult::failed(remote_path, "", e)
        }
    }
}
