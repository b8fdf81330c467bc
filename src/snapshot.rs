//! Snapshot builder: filesystem subtree → stored Merkle tree
//!
//! Walks a live subtree depth-first in post-order, hashing bottom-up: every
//! child is inserted before its parent, so directory hashes are always
//! computed over already-stored children and
//! [`put_directory`](crate::store::ObjectStore::put_directory) can trust the
//! child hashes it is given.
//!
//! Only regular files and directories are snapshotted; anything else,
//! symlinks included, fails with
//! [`InvalidEntry`](crate::error::MerkleDirError::InvalidEntry). File
//! contents are read whole; chunking large files is an explicit non-goal.

use crate::error::{MerkleDirError, Result};
use crate::hash::Hash256;
use crate::store::ObjectStore;
use std::fs;
use std::path::Path;
use tracing::{debug, trace};

/// Snapshot the subtree rooted at `path` into the store
///
/// Returns the root node's hash. The filesystem is never mutated; the store
/// gains at most the nodes not already present (unchanged subtrees of an
/// earlier snapshot deduplicate to the same hashes and insert nothing).
///
/// # Errors
///
/// - [`MerkleDirError::InvalidEntry`] if `path` does not exist, or any entry
///   in the subtree is neither a regular file nor a directory
/// - [`MerkleDirError::PathConversion`] if a file name is not valid UTF-8
/// - [`MerkleDirError::Io`] on read failures
pub fn snapshot(store: &ObjectStore, path: impl AsRef<Path>) -> Result<Hash256> {
    let path = path.as_ref();
    if fs::symlink_metadata(path).is_err() {
        return Err(MerkleDirError::InvalidEntry(path.to_path_buf()));
    }
    let root = snapshot_entry(store, path)?;
    debug!("snapshot of {:?} -> {}", path, root.short());
    Ok(root)
}

fn snapshot_entry(store: &ObjectStore, path: &Path) -> Result<Hash256> {
    // symlink_metadata so links are seen as links, not their targets
    let file_type = fs::symlink_metadata(path)?.file_type();

    if file_type.is_file() {
        let content = fs::read(path)?;
        let hash = store.put_file(&content)?;
        trace!("file {:?} -> {}", path, hash.short());
        Ok(hash)
    } else if file_type.is_dir() {
        let mut children = Vec::new();
        for entry in fs::read_dir(path)? {
            let entry = entry?;
            let name = entry
                .file_name()
                .into_string()
                .map_err(MerkleDirError::PathConversion)?;
            let child = snapshot_entry(store, &entry.path())?;
            children.push((name, child));
        }
        store.put_directory(&children)
    } else {
        Err(MerkleDirError::InvalidEntry(path.to_path_buf()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::NodeKind;
    use std::fs;
    use tempfile::TempDir;

    fn open_store() -> (ObjectStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = ObjectStore::open(dir.path().join("store")).unwrap();
        (store, dir)
    }

    #[test]
    fn test_snapshot_single_file() {
        let (store, dir) = open_store();
        let file = dir.path().join("a.txt");
        fs::write(&file, "contents").unwrap();

        let hash = snapshot(&store, &file).unwrap();
        assert_eq!(store.kind_of(&hash).unwrap(), NodeKind::File);
        assert_eq!(store.content_of(&hash).unwrap(), b"contents");
    }

    #[test]
    fn test_snapshot_nested_tree() {
        let (store, dir) = open_store();
        let root = dir.path().join("tree");
        fs::create_dir_all(root.join("sub")).unwrap();
        fs::write(root.join("top.txt"), "top").unwrap();
        fs::write(root.join("sub/deep.txt"), "deep").unwrap();

        let hash = snapshot(&store, &root).unwrap();
        let children = store.children_of(&hash).unwrap();
        let names: Vec<&str> = children.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["sub", "top.txt"]);

        let sub = store.child_by_name(&hash, "sub").unwrap().unwrap();
        assert_eq!(store.kind_of(&sub).unwrap(), NodeKind::Directory);
        let deep = store.child_by_name(&sub, "deep.txt").unwrap().unwrap();
        assert_eq!(store.content_of(&deep).unwrap(), b"deep");
    }

    #[test]
    fn test_snapshot_empty_directory() {
        let (store, dir) = open_store();
        let root = dir.path().join("empty");
        fs::create_dir(&root).unwrap();

        let hash = snapshot(&store, &root).unwrap();
        assert_eq!(store.kind_of(&hash).unwrap(), NodeKind::Directory);
        assert!(store.children_of(&hash).unwrap().is_empty());
    }

    #[test]
    fn test_missing_path_is_invalid_entry() {
        let (store, dir) = open_store();
        let err = snapshot(&store, dir.path().join("nope")).unwrap_err();
        assert!(matches!(err, MerkleDirError::InvalidEntry(_)));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_is_invalid_entry() {
        let (store, dir) = open_store();
        let root = dir.path().join("tree");
        fs::create_dir(&root).unwrap();
        fs::write(root.join("real.txt"), "real").unwrap();
        std::os::unix::fs::symlink(root.join("real.txt"), root.join("link.txt")).unwrap();

        let err = snapshot(&store, &root).unwrap_err();
        assert!(matches!(err, MerkleDirError::InvalidEntry(p) if p.ends_with("link.txt")));
    }

    #[test]
    fn test_resnapshot_is_idempotent() {
        let (store, dir) = open_store();
        let root = dir.path().join("tree");
        fs::create_dir(&root).unwrap();
        fs::write(root.join("a.txt"), "a").unwrap();

        let h1 = snapshot(&store, &root).unwrap();
        let before = store.stats().unwrap();
        let h2 = snapshot(&store, &root).unwrap();
        let after = store.stats().unwrap();

        assert_eq!(h1, h2);
        assert_eq!(before.node_count, after.node_count);
        assert_eq!(before.content_count, after.content_count);
        assert_eq!(before.edge_count, after.edge_count);
    }

    #[test]
    fn test_identical_files_share_one_content_row() {
        let (store, dir) = open_store();
        let root = dir.path().join("tree");
        fs::create_dir_all(root.join("a")).unwrap();
        fs::create_dir_all(root.join("b")).unwrap();
        fs::write(root.join("a/x.txt"), "identical").unwrap();
        fs::write(root.join("b/x.txt"), "identical").unwrap();

        snapshot(&store, &root).unwrap();
        assert_eq!(store.stats().unwrap().content_count, 1);
    }
}
