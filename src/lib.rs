// Module declarations
mod client;
mod error;
mod operations;
pub mod path;
mod remote_fs;
mod russh_fs;
mod russh_session;
mod session;
mod types;
mod utils;

// Public API exports
pub use client::SftpClient;
pub use error::{Error, Result};
pub use operations::upload::LOCAL_FILE_NOT_EXISTS;
pub use remote_fs::{OpensshFs, RemoteFs, SessionFs};
pub use russh_fs::RusshFs;
pub use session::Connection;
pub use types::{
    AuthMethod, CommandOutput, ConnectOverrides, ConnectionConfig, DEFAULT_SSH_PORT, FileMetadata,
    FileTransferProgress, FileType, RemoteTree, SftpClientConfig, TransferResult,
};
pub use utils::strip_styles;

// Re-export the underlying SFTP handle types for direct use through `OpensshFs::sftp` and `RusshFs::sftp`
pub use openssh_sftp_client::Sftp;
pub use russh_sftp::client::SftpSession;
