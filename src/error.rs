use thiserror::Error;

/// Errors returned by remote filesystem and connection operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("Not a directory: {0}")]
    NotADirectory(String),

    #[error("SSH session not connected")]
    NotConnected,

    #[error("Authentication rejected for {user}@{host}")]
    AuthenticationFailed { user: String, host: String },

    #[error("Invalid connection option '{key}': {reason}")]
    InvalidOption { key: String, reason: String },

    #[error("Remote server reported no size for {0}")]
    SizeUnavailable(String),

    #[error("Failed to parse connection config: {0}")]
    Config(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SSH error: {0}")]
    Ssh(#[from] openssh::Error),

    #[error("SFTP error: {0}")]
    Sftp(#[from] openssh_sftp_client::Error),

    #[error("SSH error: {0}")]
    Russh(#[from] russh::Error),

    #[error("SFTP error: {0}")]
    RusshSftp(#[from] russh_sftp::client::error::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
