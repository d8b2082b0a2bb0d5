/// Module for downloading files and reading remote files
pub(crate) mod download;

/// Module for listing remote directory contents
pub(crate) mod list;

/// Module for removing remote files
pub(crate) mod remove;

/// Module for uploading files to remote server
pub(crate) mod upload;

/// Module for walking remote directory trees
pub(crate) mod walk;
