use std::future::Future;
use std::pin::Pin;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::path;
use crate::remote_fs::RemoteFs;
use crate::types::RemoteTree;

/// Recursively enumerates directories and files below a remote root
///
/// The walk is depth first. Every directory is recorded before anything
/// inside it, and files are recorded in the order the walk reaches them.
///
/// # Arguments
///
/// * `fs` - The remote filesystem to walk
/// * `root_dir` - Remote directory to start from
/// * `max_depth` - Deepest directory level to descend into, `0` for no limit
///
/// # Depth
///
/// The depth of an entry is the number of its path components below
/// `root_dir`, so `/data/x` is at depth 1 under `/data`. A directory deeper
/// than `max_depth` is skipped together with everything inside it; files
/// directly inside a directory that was descended into are always listed.
///
/// # Symlinks
///
/// Entries are classified with `stat`, so a link to a directory is walked
/// like a directory. A directory that resolves to one of its own ancestors
/// (a link pointing back up the tree) is skipped, which keeps unbounded walks
/// finite.
///
/// # Errors
///
/// Returns an error if:
/// - `root_dir` does not exist or is not a directory
/// - Any directory cannot be listed or any entry cannot be stat'ed; the walk
///   stops at the first failure
pub async fn walk_files<F: RemoteFs>(
    fs: &F,
    root_dir: &str,
    max_depth: usize,
) -> Result<RemoteTree> {
    let walk_time = Instant::now();
    let mut root = path::normalize(root_dir);
    if root.len() > 1 && root.ends_with('/') {
        root.pop();
    }
    if !fs.stat(&root).await?.file_type.is_dir() {
        return Err(Error::NotADirectory(root));
    }

    let mut tree = RemoteTree::default();
    let mut ancestors = vec![fs.canonicalize(&root).await?];
    walk_dir(fs, &root, &root, max_depth, &mut ancestors, &mut tree).await?;

    info!(
        "Walked {:?}: {} dirs, {} files. Time taken {:?}",
        root,
        tree.dirs.len(),
        tree.files.len(),
        walk_time.elapsed(),
    );
    Ok(tree)
}

fn walk_dir<'a, F: RemoteFs>(
    fs: &'a F,
    root: &'a str,
    top_dir: &'a str,
    max_depth: usize,
    ancestors: &'a mut Vec<String>,
    tree: &'a mut RemoteTree,
) -> Pin<Box<dyn Future<Output = Result<()>> + 'a>> {
    Box::pin(async move {
        for name in fs.list_dir(top_dir).await? {
            let entry = path::join(top_dir, &name);
            if !fs.stat(&entry).await?.file_type.is_dir() {
                tree.files.push(entry);
                continue;
            }

            if max_depth != 0 && path::depth(root, &entry) > max_depth {
                debug!("Skipping {:?}: deeper than {}", entry, max_depth);
                continue;
            }
            let resolved = fs.canonicalize(&entry).await?;
            if ancestors.contains(&resolved) {
                warn!("Skipping {:?}: resolves to its ancestor {:?}", entry, resolved);
                continue;
            }
            debug!("Descending into {:?}", entry);
            tree.dirs.push(entry.clone());
            ancestors.push(resolved);
            walk_dir(fs, root, &entry, max_depth, ancestors, tree).await?;
            ancestors.pop();
        }
        Ok(())
    })
}
