use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Port used when a config does not name one
pub const DEFAULT_SSH_PORT: u16 = 22;

/// Connection parameters for one remote host
///
/// Built once and left untouched; call-time changes go through
/// [`ConnectOverrides`] when connecting.
#[derive(Debug, Clone, Deserialize)]
pub struct ConnectionConfig {
    host: String,
    user: String,
    #[serde(default)]
    password: Option<SecretString>,
    #[serde(default = "default_port")]
    port: u16,
    #[serde(default)]
    key_path: Option<PathBuf>,
    /// Extra transport options, see `Connection::connect` for the recognised keys
    #[serde(default)]
    options: HashMap<String, serde_json::Value>,
}

fn default_port() -> u16 {
    DEFAULT_SSH_PORT
}

impl ConnectionConfig {
    /// Creates a config for `user@host` on the default SSH port
    pub fn new(host: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            user: user.into(),
            password: None,
            port: DEFAULT_SSH_PORT,
            key_path: None,
            options: HashMap::new(),
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(SecretString::from(password.into()));
        self
    }

    pub fn with_key_path(mut self, key_path: impl Into<PathBuf>) -> Self {
        self.key_path = Some(key_path.into());
        self
    }

    pub fn with_option(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// Parses a config from a JSON document
    ///
    /// # Example
    ///
    /// ```
    /// let config = topssh::ConnectionConfig::from_json_str(
    ///     r#"{"host": "example.com", "user": "deploy", "options": {"connect_timeout": 30}}"#,
    /// )?;
    /// assert_eq!(config.port(), 22);
    /// # Ok::<(), topssh::Error>(())
    /// ```
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads and parses a JSON config file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn key_path(&self) -> Option<&Path> {
        self.key_path.as_deref()
    }

    pub fn has_password(&self) -> bool {
        self.password.is_some()
    }

    pub(crate) fn password(&self) -> Option<&SecretString> {
        self.password.as_ref()
    }

    pub fn options(&self) -> &HashMap<String, serde_json::Value> {
        &self.options
    }

    /// Returns the effective config for one connection attempt.
    ///
    /// Each override wins over the stored value unless it is absent or empty
    /// (an empty string, or port 0).
    pub fn resolve(&self, overrides: &ConnectOverrides) -> ConnectionConfig {
        fn pick(over: &Option<String>, stored: &str) -> String {
            match over {
                Some(value) if !value.is_empty() => value.clone(),
                _ => stored.to_string(),
            }
        }

        let password = match &overrides.password {
            Some(password) if !password.expose_secret().is_empty() => Some(password.clone()),
            _ => self.password.clone(),
        };

        ConnectionConfig {
            host: pick(&overrides.host, &self.host),
            user: pick(&overrides.user, &self.user),
            password,
            port: overrides.port.filter(|port| *port != 0).unwrap_or(self.port),
            key_path: self.key_path.clone(),
            options: self.options.clone(),
        }
    }

    /// Credentials to authenticate with; a key file wins over a password
    pub fn auth_method(&self) -> AuthMethod {
        match (&self.key_path, &self.password) {
            (Some(key_path), _) => AuthMethod::KeyFile(key_path.clone()),
            (None, Some(_)) => AuthMethod::Password,
            (None, None) => AuthMethod::Default,
        }
    }
}

/// Call-time replacements for the stored connection parameters
#[derive(Debug, Clone, Default)]
pub struct ConnectOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub password: Option<SecretString>,
}

impl ConnectOverrides {
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(SecretString::from(password.into()));
        self
    }
}

/// How the transport should authenticate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthMethod {
    /// Private key file
    KeyFile(PathBuf),
    /// Password from the config
    Password,
    /// Whatever the local ssh client would use (agent, default keys)
    Default,
}

/// Configuration for SFTP client operations
#[derive(Debug, Clone)]
pub struct SftpClientConfig {
    /// Buffer size for streamed reads and writes in bytes
    pub io_size: usize,
}

impl Default for SftpClientConfig {
    /// - io_size: 65536 (64KB)
    fn default() -> Self {
        Self { io_size: 65536 }
    }
}

impl SftpClientConfig {
    /// Creates a new configuration with a custom buffer size
    pub fn new(io_size: usize) -> Self {
        Self { io_size }
    }
}

/// Metadata information for a remote path
#[derive(Debug, Clone)]
pub struct FileMetadata {
    pub path: String,
    pub size: Option<u64>,
    pub file_type: FileType,
    pub last_accessed_at: Option<std::time::SystemTime>,
    pub last_modified_at: Option<std::time::SystemTime>,
}

/// Type of a remote path as reported by stat
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    Regular,
    Directory,
    Symlink,
    Other,
}

impl FileType {
    pub fn is_dir(self) -> bool {
        self == FileType::Directory
    }
}

/// Directories and files found below a remote root
///
/// `dirs` is in pre-order (a directory always precedes its descendants);
/// `files` is in the order the walk reached them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteTree {
    pub dirs: Vec<String>,
    pub files: Vec<String>,
}

/// Result of an upload, download or delete
#[derive(Debug, Clone)]
pub enum TransferResult {
    /// Operation completed successfully
    Completed(FileTransferProgress),
    /// Operation failed; `detail` is the human-readable reason
    Failed {
        src_file: String,
        dest_file: String,
        detail: String,
    },
}

/// Summary of a completed operation
///
/// For deletes `src_file` is the removed path and `dest_file` is empty.
#[derive(Debug, Clone)]
pub struct FileTransferProgress {
    /// Source file path
    pub src_file: String,
    /// Destination file path
    pub dest_file: String,
    /// Number of bytes transferred
    pub file_size: u64,
}

impl TransferResult {
    pub(crate) fn completed(
        src_file: impl Into<String>,
        dest_file: impl Into<String>,
        file_size: u64,
    ) -> Self {
        TransferResult::Completed(FileTransferProgress {
            src_file: src_file.into(),
            dest_file: dest_file.into(),
            file_size,
        })
    }

    pub(crate) fn failed(
        src_file: impl Into<String>,
        dest_file: impl Into<String>,
        detail: impl ToString,
    ) -> Self {
        TransferResult::Failed {
            src_file: src_file.into(),
            dest_file: dest_file.into(),
            detail: detail.to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, TransferResult::Completed(_))
    }

    /// Describes the outcome: the transfer summary or the failure reason
    pub fn detail(&self) -> String {
        match self {
            TransferResult::Completed(progress) if progress.dest_file.is_empty() => {
                format!("{} removed", progress.src_file)
            }
            TransferResult::Completed(progress) => format!(
                "{} -> {} ({} bytes)",
                progress.src_file, progress.dest_file, progress.file_size
            ),
            TransferResult::Failed { detail, .. } => detail.clone(),
        }
    }
}

/// Output of a command run on the remote host
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    /// Exit code, absent when the command was killed by a signal
    pub exit_status: Option<i32>,
}

impl CommandOutput {
    pub(crate) fn from_raw(stdout: &[u8], stderr: &[u8], exit_status: Option<i32>) -> Self {
        Self {
            stdout: String::from_utf8_lossy(stdout).into_owned(),
            stderr: String::from_utf8_lossy(stderr).into_owned(),
            exit_status,
        }
    }

    pub fn success(&self) -> bool {
        self.exit_status == Some(0)
    }
}
