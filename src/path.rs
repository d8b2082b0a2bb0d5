//! Remote path helpers.
//!
//! Remote paths are plain `/`-separated strings. They are built by
//! concatenating a directory and a name, which can leave doubled separators
//! behind, so every remote path goes through [`normalize`] before it reaches
//! the SFTP handle.

/// Returns `path` as an absolute remote path with every run of `/` collapsed.
///
/// ```
/// assert_eq!(topssh::path::normalize("a//b///c"), "/a/b/c");
/// assert_eq!(topssh::path::normalize("/"), "/");
/// ```
pub fn normalize(path: &str) -> String {
    let mut normalized = String::with_capacity(path.len() + 1);
    normalized.push('/');
    for c in path.chars() {
        if c == '/' && normalized.ends_with('/') {
            continue;
        }
        normalized.push(c);
    }
    normalized
}

/// Joins a remote directory and an entry name into a normalized path.
pub fn join(dir: &str, name: &str) -> String {
    normalize(&format!("{dir}/{name}"))
}

/// Number of path components of `path` below `root`.
///
/// Computed from the path itself rather than from a traversal counter. A
/// path outside `root` counts all of its components.
pub fn depth(root: &str, path: &str) -> usize {
    let root: Vec<&str> = components(root).collect();
    let path: Vec<&str> = components(path).collect();
    if path.starts_with(&root) {
        path.len() - root.len()
    } else {
        path.len()
    }
}

/// Last non-empty component of a remote path.
pub fn file_name(path: &str) -> Option<&str> {
    path.rsplit('/').find(|c| !c.is_empty())
}

fn components(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|c| !c.is_empty())
}
