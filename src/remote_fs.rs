use bytes::BytesMut;
use futures::stream::StreamExt;
use openssh_sftp_client::Sftp;
use openssh_sftp_client::metadata::MetaData;
use std::path::Path;
use tokio::fs;
use tokio::io::{self, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::russh_fs::RusshFs;
use crate::types::{FileMetadata, FileType, SftpClientConfig};

/// The remote filesystem operations the helpers in this crate are built on
///
/// Every path handed to an implementation is already normalized. The
/// production implementations are [`OpensshFs`] and [`RusshFs`]; anything
/// else providing these operations (an in-memory fake, say) can stand in.
#[allow(async_fn_in_trait)]
pub trait RemoteFs {
    /// Names of the entries of a directory, without `.` and `..`
    async fn list_dir(&self, path: &str) -> Result<Vec<String>>;

    /// Metadata of a path, following symlinks
    async fn stat(&self, path: &str) -> Result<FileMetadata>;

    /// Absolute path with every symlink resolved
    async fn canonicalize(&self, path: &str) -> Result<String>;

    /// Copies a remote file to a local path, returning the bytes copied
    ///
    /// A partially written local file is removed when the copy fails.
    async fn get(&self, remote_path: &str, local_path: &Path) -> Result<u64>;

    /// Copies a local file to a remote path, returning the bytes copied
    async fn put(&self, local_path: &Path, remote_path: &str) -> Result<u64>;

    /// Opens a remote file for reading and reads it to the end
    async fn read(&self, remote_path: &str) -> Result<Vec<u8>>;

    /// Opens (creating or truncating) a remote file and writes `data` to it
    async fn write(&self, remote_path: &str, data: &[u8]) -> Result<()>;

    /// Removes a remote file
    async fn remove(&self, remote_path: &str) -> Result<()>;

    /// Releases the handle
    async fn close(self) -> Result<()>
    where
        Self: Sized;
}

/// The SFTP handle of a [`Connection`](crate::Connection)
///
/// Key and agent logins go through the system ssh client ([`OpensshFs`]),
/// password logins through the in-process russh client ([`RusshFs`]).
#[derive(Debug)]
pub enum SessionFs {
    Openssh(OpensshFs),
    Russh(RusshFs),
}

impl RemoteFs for SessionFs {
    async fn list_dir(&self, path: &str) -> Result<Vec<String>> {
        match self {
            SessionFs::Openssh(fs) => fs.list_dir(path).await,
            SessionFs::Russh(fs) => fs.list_dir(path).await,
        }
    }

    async fn stat(&self, path: &str) -> Result<FileMetadata> {
        match self {
            SessionFs::Openssh(fs) => fs.stat(path).await,
            SessionFs::Russh(fs) => fs.stat(path).await,
        }
    }

    async fn canonicalize(&self, path: &str) -> Result<String> {
        match self {
            SessionFs::Openssh(fs) => fs.canonicalize(path).await,
            SessionFs::Russh(fs) => fs.canonicalize(path).await,
        }
    }

    async fn get(&self, remote_path: &str, local_path: &Path) -> Result<u64> {
        match self {
            SessionFs::Openssh(fs) => fs.get(remote_path, local_path).await,
            SessionFs::Russh(fs) => fs.get(remote_path, local_path).await,
        }
    }

    async fn put(&self, local_path: &Path, remote_path: &str) -> Result<u64> {
        match self {
            SessionFs::Openssh(fs) => fs.put(local_path, remote_path).await,
            SessionFs::Russh(fs) => fs.put(local_path, remote_path).await,
        }
    }

    async fn read(&self, remote_path: &str) -> Result<Vec<u8>> {
        match self {
            SessionFs::Openssh(fs) => fs.read(remote_path).await,
            SessionFs::Russh(fs) => fs.read(remote_path).await,
        }
    }

    async fn write(&self, remote_path: &str, data: &[u8]) -> Result<()> {
        match self {
            SessionFs::Openssh(fs) => fs.write(remote_path, data).await,
            SessionFs::Russh(fs) => fs.write(remote_path, data).await,
        }
    }

    async fn remove(&self, remote_path: &str) -> Result<()> {
        match self {
            SessionFs::Openssh(fs) => fs.remove(remote_path).await,
            SessionFs::Russh(fs) => fs.remove(remote_path).await,
        }
    }

    async fn close(self) -> Result<()> {
        match self {
            SessionFs::Openssh(fs) => fs.close().await,
            SessionFs::Russh(fs) => fs.close().await,
        }
    }
}

/// Streams `reader` into a new local file
///
/// The local file is removed again if the copy fails part way.
pub(crate) async fn write_local<R: AsyncRead + Unpin>(
    mut reader: R,
    local_path: &Path,
) -> Result<u64> {
    let mut local_file = fs::File::create(local_path).await?;
    debug!("Local file created: {:?}", local_path);
    let copied = async {
        let copied = io::copy(&mut reader, &mut local_file).await?;
        local_file.flush().await?;
        Ok::<u64, Error>(copied)
    }
    .await;
    drop(local_file);
    discard_on_error(local_path, copied).await
}

async fn discard_on_error<T>(local_path: &Path, result: Result<T>) -> Result<T> {
    if result.is_err() {
        debug!("Removing partial download {:?}", local_path);
        if let Err(e) = fs::remove_file(local_path).await {
            warn!("Could not remove partial download {:?}: {}", local_path, e);
        }
    }
    result
}

/// Streams `data` into an open remote file and closes it
pub(crate) async fn write_remote<W: AsyncWrite + Unpin>(mut remote_file: W, data: &[u8]) -> Result<()> {
    remote_file.write_all(data).await?;
    remote_file.flush().await?;
    remote_file.shutdown().await?;
    Ok(())
}

/// [`RemoteFs`] over an `openssh_sftp_client` handle
#[derive(Debug)]
pub struct OpensshFs {
    sftp: Sftp,
    config: SftpClientConfig,
}

impl OpensshFs {
    pub fn new(sftp: Sftp, config: SftpClientConfig) -> Self {
        Self { sftp, config }
    }

    /// The underlying SFTP handle, for operations this crate has no helper for
    pub fn sftp(&self) -> &Sftp {
        &self.sftp
    }

    fn read_size(&self) -> u32 {
        u32::try_from(self.config.io_size).unwrap_or(u32::MAX)
    }
}

fn to_metadata(path: &str, metadata: MetaData) -> FileMetadata {
    let file_type = match metadata.file_type() {
        Some(file_type) if file_type.is_dir() => FileType::Directory,
        Some(file_type) if file_type.is_file() => FileType::Regular,
        Some(file_type) if file_type.is_symlink() => FileType::Symlink,
        _ => FileType::Other,
    };
    FileMetadata {
        path: path.to_string(),
        size: metadata.len(),
        file_type,
        last_accessed_at: metadata.accessed().map(|t| t.as_system_time()),
        last_modified_at: metadata.modified().map(|t| t.as_system_time()),
    }
}

/// Name of a directory entry, `None` for `.`, `..` and names that are not UTF-8
fn entry_name(filename: &Path) -> Option<&str> {
    let name = filename.file_name()?.to_str();
    if name.is_none() {
        warn!("Skipping entry with a non UTF-8 name: {:?}", filename);
    }
    name
}

impl RemoteFs for OpensshFs {
    async fn list_dir(&self, path: &str) -> Result<Vec<String>> {
        let dir = self.sftp.fs().open_dir(path).await?;
        let dir_stream = dir.read_dir();
        futures::pin_mut!(dir_stream);

        let mut names = Vec::new();
        while let Some(entry) = dir_stream.next().await {
            let entry = entry?;
            if let Some(name) = entry_name(entry.filename()) {
                names.push(name.to_string());
            }
        }
        debug!("Listed {} entries in {:?}", names.len(), path);
        Ok(names)
    }

    async fn stat(&self, path: &str) -> Result<FileMetadata> {
        let metadata = self.sftp.fs().metadata(path).await?;
        Ok(to_metadata(path, metadata))
    }

    async fn canonicalize(&self, path: &str) -> Result<String> {
        let resolved = self.sftp.fs().canonicalize(path).await?;
        Ok(resolved.to_string_lossy().into_owned())
    }

    async fn get(&self, remote_path: &str, local_path: &Path) -> Result<u64> {
        let mut remote_file = self.sftp.open(remote_path).await?;
        debug!("Remote file opened: {:?}", remote_path);

        let received = match fs::File::create(local_path).await {
            Ok(mut local_file) => {
                debug!("Local file created: {:?}", local_path);
                let copied = async {
                    let mut transferred = 0u64;
                    loop {
                        let buffer = BytesMut::with_capacity(self.config.io_size);
                        match remote_file.read(self.read_size(), buffer).await? {
                            Some(buf) => {
                                local_file.write_all(&buf).await?;
                                transferred += buf.len() as u64;
                            }
                            None => break,
                        }
                    }
                    local_file.flush().await?;
                    Ok::<u64, Error>(transferred)
                }
                .await;
                drop(local_file);
                discard_on_error(local_path, copied).await
            }
            Err(e) => Err(e.into()),
        };

        if let Err(e) = remote_file.close().await {
            warn!("Ignoring error while closing {:?}: {}", remote_path, e);
        }
        received
    }

    async fn put(&self, local_path: &Path, remote_path: &str) -> Result<u64> {
        let mut local_file = fs::File::open(local_path).await?;
        debug!("Local file opened: {:?}", local_path);
        let mut remote_file = self.sftp.create(remote_path).await?;
        debug!("Remote file created path: {:?}", remote_path);

        let mut buffer = vec![0; self.config.io_size];
        let mut transferred = 0u64;
        loop {
            let bytes_read = local_file.read(&mut buffer[..]).await?;
            if bytes_read == 0 {
                break;
            }
            remote_file.write_all(&buffer[..bytes_read]).await?;
            transferred += bytes_read as u64;
        }
        remote_file.close().await?;
        Ok(transferred)
    }

    async fn read(&self, remote_path: &str) -> Result<Vec<u8>> {
        let mut remote_file = self.sftp.open(remote_path).await?;
        let mut content = Vec::new();
        loop {
            let buffer = BytesMut::with_capacity(self.config.io_size);
            match remote_file.read(self.read_size(), buffer).await? {
                Some(buf) => content.extend_from_slice(&buf),
                None => break,
            }
        }
        remote_file.close().await?;
        Ok(content)
    }

    async fn write(&self, remote_path: &str, data: &[u8]) -> Result<()> {
        let mut remote_file = self.sftp.create(remote_path).await?;
        remote_file.write_all(data).await?;
        remote_file.close().await?;
        Ok(())
    }

    async fn remove(&self, remote_path: &str) -> Result<()> {
        self.sftp.fs().remove_file(remote_path).await?;
        Ok(())
    }

    async fn close(self) -> Result<()> {
        self.sftp.close().await?;
        Ok(())
    }
}
