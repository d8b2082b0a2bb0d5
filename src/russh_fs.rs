use russh::client;
use russh_sftp::client::SftpSession;
use russh_sftp::protocol::{FileAttributes, OpenFlags};
use std::fmt;
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::fs;
use tokio::io::{self, AsyncReadExt, AsyncWriteExt};
use tracing::debug;

use crate::error::Result;
use crate::remote_fs::{RemoteFs, write_local, write_remote};
use crate::types::{FileMetadata, FileType};

/// [`RemoteFs`] over a `russh_sftp` session
///
/// Used for password logins, which the system ssh client cannot take.
pub struct RusshFs {
    sftp: SftpSession,
}

impl fmt::Debug for RusshFs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RusshFs").finish_non_exhaustive()
    }
}

impl RusshFs {
    /// Starts the SFTP subsystem on an authenticated session
    pub(crate) async fn open<H: client::Handler>(handle: &client::Handle<H>) -> Result<Self> {
        let channel = handle.channel_open_session().await?;
        channel.request_subsystem(true, "sftp").await?;
        let sftp = SftpSession::new(channel.into_stream()).await?;
        debug!("sftp session started over russh");
        Ok(Self { sftp })
    }

    /// The underlying SFTP session, for operations this crate has no helper for
    pub fn sftp(&self) -> &SftpSession {
        &self.sftp
    }
}

fn timestamp(secs: Option<impl Into<u64>>) -> Option<SystemTime> {
    secs.map(|secs| UNIX_EPOCH + Duration::from_secs(secs.into()))
}

fn to_metadata(path: &str, attrs: &FileAttributes) -> FileMetadata {
    let kind = attrs.file_type();
    let file_type = if kind.is_dir() {
        FileType::Directory
    } else if kind.is_file() {
        FileType::Regular
    } else if kind.is_symlink() {
        FileType::Symlink
    } else {
        FileType::Other
    };
    FileMetadata {
        path: path.to_string(),
        size: attrs.size,
        file_type,
        last_accessed_at: timestamp(attrs.atime),
        last_modified_at: timestamp(attrs.mtime),
    }
}

impl RemoteFs for RusshFs {
    async fn list_dir(&self, path: &str) -> Result<Vec<String>> {
        let names: Vec<String> = self
            .sftp
            .read_dir(path)
            .await?
            .map(|entry| entry.file_name())
            .filter(|name| name != "." && name != "..")
            .collect();
        debug!("Listed {} entries in {:?}", names.len(), path);
        Ok(names)
    }

    async fn stat(&self, path: &str) -> Result<FileMetadata> {
        let attrs = self.sftp.metadata(path).await?;
        Ok(to_metadata(path, &attrs))
    }

    async fn canonicalize(&self, path: &str) -> Result<String> {
        Ok(self.sftp.canonicalize(path).await?)
    }

    async fn get(&self, remote_path: &str, local_path: &Path) -> Result<u64> {
        let remote_file = self.sftp.open(remote_path).await?;
        debug!("Remote file opened: {:?}", remote_path);
        write_local(remote_file, local_path).await
    }

    async fn put(&self, local_path: &Path, remote_path: &str) -> Result<u64> {
        let mut local_file = fs::File::open(local_path).await?;
        debug!("Local file opened: {:?}", local_path);
        let mut remote_file = self
            .sftp
            .open_with_flags(
                remote_path,
                OpenFlags::CREATE | OpenFlags::TRUNCATE | OpenFlags::WRITE,
            )
            .await?;
        debug!("Remote file created path: {:?}", remote_path);

        let transferred = io::copy(&mut local_file, &mut remote_file).await?;
        remote_file.flush().await?;
        remote_file.shutdown().await?;
        Ok(transferred)
    }

    async fn read(&self, remote_path: &str) -> Result<Vec<u8>> {
        let mut remote_file = self.sftp.open(remote_path).await?;
        let mut content = Vec::new();
        remote_file.read_to_end(&mut content).await?;
        Ok(content)
    }

    async fn write(&self, remote_path: &str, data: &[u8]) -> Result<()> {
        let remote_file = self
            .sftp
            .open_with_flags(
                remote_path,
                OpenFlags::CREATE | OpenFlags::TRUNCATE | OpenFlags::WRITE,
            )
            .await?;
        write_remote(remote_file, data).await
    }

    async fn remove(&self, remote_path: &str) -> Result<()> {
        self.sftp.remove_file(remote_path).await?;
        Ok(())
    }

    async fn close(self) -> Result<()> {
        self.sftp.close().await?;
        Ok(())
    }
}
