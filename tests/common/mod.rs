#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::io;
use std::path::Path;

use topssh::{Error, FileMetadata, FileType, RemoteFs, Result};

#[derive(Clone)]
enum Node {
    Dir,
    File(Vec<u8>),
    Link(String),
}

/// Remote filesystem kept in memory; entries list in insertion order
#[derive(Default)]
pub struct MemoryFs {
    entries: RefCell<Vec<(String, Node)>>,
    failing: RefCell<HashSet<String>>,
    calls: Cell<usize>,
}

fn parent(path: &str) -> &str {
    match path.rsplit_once('/') {
        Some(("", _)) => "/",
        Some((parent, _)) => parent,
        None => "/",
    }
}

fn not_found(path: &str) -> Error {
    Error::Io(io::Error::new(io::ErrorKind::NotFound, format!("no such file: {path}")))
}

impl MemoryFs {
    pub fn new() -> Self {
        let fs = Self::default();
        fs.entries.borrow_mut().push(("/".to_string(), Node::Dir));
        fs
    }

    pub fn dir(self, path: &str) -> Self {
        self.entries.borrow_mut().push((path.to_string(), Node::Dir));
        self
    }

    pub fn file(self, path: &str, content: &[u8]) -> Self {
        self.entries
            .borrow_mut()
            .push((path.to_string(), Node::File(content.to_vec())));
        self
    }

    /// Symlink at `path` pointing to the absolute path `target`
    pub fn link(self, path: &str, target: &str) -> Self {
        self.entries
            .borrow_mut()
            .push((path.to_string(), Node::Link(target.to_string())));
        self
    }

    /// Makes every operation on `path` fail with a permission error
    pub fn fail_on(self, path: &str) -> Self {
        self.failing.borrow_mut().insert(path.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.get()
    }

    pub fn content(&self, path: &str) -> Option<Vec<u8>> {
        self.entries.borrow().iter().find_map(|(p, node)| match node {
            Node::File(content) if p == path => Some(content.clone()),
            _ => None,
        })
    }

    fn enter(&self, path: &str) -> Result<()> {
        self.calls.set(self.calls.get() + 1);
        if self.failing.borrow().contains(path) {
            return Err(Error::Io(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("permission denied: {path}"),
            )));
        }
        Ok(())
    }

    fn node(&self, path: &str) -> Option<Node> {
        self.entries
            .borrow()
            .iter()
            .find(|(p, _)| p == path)
            .map(|(_, node)| node.clone())
    }

    /// `path` with every symlink along it replaced by its target
    fn resolve(&self, path: &str) -> Option<String> {
        let mut resolved = String::new();
        for name in path.split('/').filter(|name| !name.is_empty()) {
            let mut current = format!("{resolved}/{name}");
            if let Node::Link(target) = self.node(&current)? {
                current = self.resolve(&target)?;
            }
            resolved = current;
        }
        Some(if resolved.is_empty() { "/".to_string() } else { resolved })
    }

    fn store(&self, path: &str, content: Vec<u8>) -> Result<()> {
        if !matches!(self.node(parent(path)), Some(Node::Dir)) {
            return Err(not_found(parent(path)));
        }
        let mut entries = self.entries.borrow_mut();
        match entries.iter_mut().find(|(p, _)| p == path) {
            Some((_, node)) => *node = Node::File(content),
            None => entries.push((path.to_string(), Node::File(content))),
        }
        Ok(())
    }
}

impl RemoteFs for MemoryFs {
    async fn list_dir(&self, path: &str) -> Result<Vec<String>> {
        self.enter(path)?;
        let real = self.resolve(path).ok_or_else(|| not_found(path))?;
        match self.node(&real) {
            Some(Node::Dir) => Ok(self
                .entries
                .borrow()
                .iter()
                .filter(|(p, _)| p != "/" && parent(p) == real)
                .filter_map(|(p, _)| p.rsplit('/').next().map(str::to_string))
                .collect()),
            Some(_) => Err(Error::NotADirectory(path.to_string())),
            None => Err(not_found(path)),
        }
    }

    async fn stat(&self, path: &str) -> Result<FileMetadata> {
        self.enter(path)?;
        let real = self.resolve(path).ok_or_else(|| not_found(path))?;
        let (file_type, size) = match self.node(&real) {
            Some(Node::Dir) => (FileType::Directory, Some(4096)),
            Some(Node::File(content)) => (FileType::Regular, Some(content.len() as u64)),
            _ => return Err(not_found(path)),
        };
        Ok(FileMetadata {
            path: path.to_string(),
            size,
            file_type,
            last_accessed_at: None,
            last_modified_at: None,
        })
    }

    async fn canonicalize(&self, path: &str) -> Result<String> {
        self.enter(path)?;
        self.resolve(path).ok_or_else(|| not_found(path))
    }

    async fn get(&self, remote_path: &str, local_path: &Path) -> Result<u64> {
        let content = self.read(remote_path).await?;
        std::fs::write(local_path, &content)?;
        Ok(content.len() as u64)
    }

    async fn put(&self, local_path: &Path, remote_path: &str) -> Result<u64> {
        self.enter(remote_path)?;
        let content = std::fs::read(local_path)?;
        let size = content.len() as u64;
        self.store(remote_path, content)?;
        Ok(size)
    }

    async fn read(&self, remote_path: &str) -> Result<Vec<u8>> {
        self.enter(remote_path)?;
        match self.node(remote_path) {
            Some(Node::File(content)) => Ok(content),
            _ => Err(not_found(remote_path)),
        }
    }

    async fn write(&self, remote_path: &str, data: &[u8]) -> Result<()> {
        self.enter(remote_path)?;
        self.store(remote_path, data.to_vec())
    }

    async fn remove(&self, remote_path: &str) -> Result<()> {
        self.enter(remote_path)?;
        let mut entries = self.entries.borrow_mut();
        match entries
            .iter()
            .position(|(p, node)| p == remote_path && matches!(node, Node::File(_)))
        {
            Some(index) => {
                entries.remove(index);
                Ok(())
            }
            None => Err(not_found(remote_path)),
        }
    }

    async fn close(self) -> Result<()> {
        Ok(())
    }
}
