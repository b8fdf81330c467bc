//! Tree navigator: path resolution against stored trees
//!
//! Resolution follows parent→child edges one hop at a time through the
//! store's `(parent, name)` index, so the cost is one point lookup per path
//! component, independent of directory fan-out and of total tree size.

use crate::error::Result;
use crate::hash::Hash256;
use crate::store::ObjectStore;
use tracing::trace;

/// Resolve a slash-separated relative path against a stored root
///
/// Leading and trailing slashes are ignored; the empty path resolves to
/// `root` itself (without checking that the root is stored). Returns
/// `Ok(None)` as soon as any component is missing, including interior empty
/// components such as in `"a//b"`, which name nothing.
///
/// # Example
///
/// ```rust,no_run
/// # use merkledir::{store::ObjectStore, navigate::find, snapshot::snapshot};
/// # fn main() -> merkledir::Result<()> {
/// # let store = ObjectStore::open(".merkledir")?;
/// # let root = snapshot(&store, "project")?;
/// let hit = find(&store, &root, "src/lib.rs")?;
/// let miss = find(&store, &root, "src/missing.rs")?;
/// assert!(miss.is_none());
/// # Ok(())
/// # }
/// ```
pub fn find(store: &ObjectStore, root: &Hash256, path: &str) -> Result<Option<Hash256>> {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        return Ok(Some(*root));
    }

    let mut current = *root;
    for component in trimmed.split('/') {
        match store.child_by_name(&current, component)? {
            Some(child) => current = child,
            None => {
                trace!("find: no entry {:?} under {}", component, current.short());
                return Ok(None);
            }
        }
    }
    Ok(Some(current))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::snapshot;
    use std::fs;
    use tempfile::TempDir;

    fn sample_tree() -> (ObjectStore, Hash256, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = ObjectStore::open(dir.path().join("store")).unwrap();
        let root = dir.path().join("tree");
        fs::create_dir_all(root.join("dir")).unwrap();
        fs::write(root.join("dir/file.txt"), "hello").unwrap();
        fs::write(root.join("top.txt"), "top").unwrap();
        let hash = snapshot(&store, &root).unwrap();
        (store, hash, dir)
    }

    #[test]
    fn test_find_nested_file() {
        let (store, root, _dir) = sample_tree();
        let file = find(&store, &root, "dir/file.txt").unwrap().unwrap();
        assert_eq!(store.content_of(&file).unwrap(), b"hello");
    }

    #[test]
    fn test_find_missing_returns_none() {
        let (store, root, _dir) = sample_tree();
        assert!(find(&store, &root, "dir/missing.txt").unwrap().is_none());
        assert!(find(&store, &root, "no/such/depth").unwrap().is_none());
    }

    #[test]
    fn test_empty_path_resolves_to_root() {
        let (store, root, _dir) = sample_tree();
        assert_eq!(find(&store, &root, "").unwrap(), Some(root));
    }

    #[test]
    fn test_slashes_are_trimmed() {
        let (store, root, _dir) = sample_tree();
        let bare = find(&store, &root, "dir/file.txt").unwrap();
        assert_eq!(find(&store, &root, "/dir/file.txt").unwrap(), bare);
        assert_eq!(find(&store, &root, "dir/file.txt/").unwrap(), bare);
        assert_eq!(find(&store, &root, "/").unwrap(), Some(root));
    }

    #[test]
    fn test_interior_empty_component_misses() {
        let (store, root, _dir) = sample_tree();
        assert!(find(&store, &root, "dir//file.txt").unwrap().is_none());
    }

    #[test]
    fn test_path_through_file_misses() {
        let (store, root, _dir) = sample_tree();
        // top.txt is a file; it has no children to descend into.
        assert!(find(&store, &root, "top.txt/deeper").unwrap().is_none());
    }
}
