//! Materializer: stored tree → filesystem
//!
//! Writes a stored node back out as real files and directories. The target
//! path must not exist; nothing is ever overwritten. Failures of any kind
//! (missing hash, collision, permission error) come back as `false` rather
//! than an error: callers use `fetch` speculatively and only care whether
//! the copy landed.
//!
//! A failure partway through a directory leaves the already-written subset
//! on disk. There is no rollback or temp-and-rename step, and tests pin
//! that; cleanup policy belongs to the caller.

use crate::error::Result;
use crate::hash::Hash256;
use crate::store::{NodeKind, ObjectStore};
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// Materialize the node `hash` at `target`
///
/// Returns `true` on full success. Returns `false` if `target` already
/// exists (file, directory, or symlink), if the hash is absent from the
/// store, or if any filesystem operation fails; whatever was written before
/// the failure remains in place.
pub fn fetch(store: &ObjectStore, hash: &Hash256, target: impl AsRef<Path>) -> bool {
    let target = target.as_ref();
    if fs::symlink_metadata(target).is_ok() {
        warn!("fetch target {:?} already exists", target);
        return false;
    }
    match fetch_node(store, hash, target) {
        Ok(()) => {
            debug!("fetched {} to {:?}", hash.short(), target);
            true
        }
        Err(err) => {
            warn!("fetch of {} to {:?} failed: {}", hash.short(), target, err);
            false
        }
    }
}

fn fetch_node(store: &ObjectStore, hash: &Hash256, target: &Path) -> Result<()> {
    match store.kind_of(hash)? {
        NodeKind::File => {
            let content = store.content_of(hash)?;
            fs::write(target, content)?;
        }
        NodeKind::Directory => {
            fs::create_dir(target)?;
            for (name, child) in store.children_of(hash)? {
                fetch_node(store, &child, &target.join(name))?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::hash_bytes;
    use crate::snapshot::snapshot;
    use std::fs;
    use tempfile::TempDir;

    fn open_store() -> (ObjectStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = ObjectStore::open(dir.path().join("store")).unwrap();
        (store, dir)
    }

    #[test]
    fn test_fetch_round_trips_a_tree() {
        let (store, dir) = open_store();
        let src = dir.path().join("src");
        fs::create_dir_all(src.join("sub")).unwrap();
        fs::write(src.join("a.txt"), "alpha").unwrap();
        fs::write(src.join("sub/b.txt"), "beta").unwrap();
        let hash = snapshot(&store, &src).unwrap();

        let dest = dir.path().join("dest");
        assert!(fetch(&store, &hash, &dest));

        assert_eq!(fs::read_to_string(dest.join("a.txt")).unwrap(), "alpha");
        assert_eq!(fs::read_to_string(dest.join("sub/b.txt")).unwrap(), "beta");
        // And re-snapshotting the copy lands on the same hash.
        assert_eq!(snapshot(&store, &dest).unwrap(), hash);
    }

    #[test]
    fn test_fetch_single_file() {
        let (store, dir) = open_store();
        let hash = store.put_file(b"just bytes").unwrap();
        let dest = dir.path().join("out.bin");

        assert!(fetch(&store, &hash, &dest));
        assert_eq!(fs::read(&dest).unwrap(), b"just bytes");
    }

    #[test]
    fn test_fetch_refuses_existing_target() {
        let (store, dir) = open_store();
        let hash = store.put_file(b"content").unwrap();
        let dest = dir.path().join("taken");
        fs::write(&dest, "already here").unwrap();

        assert!(!fetch(&store, &hash, &dest));
        assert_eq!(fs::read_to_string(&dest).unwrap(), "already here");
    }

    #[test]
    fn test_fetch_missing_hash_is_false() {
        let (store, dir) = open_store();
        let ghost = hash_bytes(b"never stored");
        assert!(!fetch(&store, &ghost, dir.path().join("out")));
    }

    #[test]
    fn test_failed_fetch_leaves_partial_output() {
        let (store, dir) = open_store();
        // Directory with one good file and one child whose content row is
        // reachable only through a hash the store has never seen.
        let good = store.put_file(b"good").unwrap();
        let ghost = hash_bytes(b"dangling");
        let root = store
            .put_directory(&[("a_good.txt".to_string(), good), ("b_bad.txt".to_string(), ghost)])
            .unwrap();

        let dest = dir.path().join("partial");
        assert!(!fetch(&store, &root, &dest));
        // No rollback: the directory and the first child survive.
        assert!(dest.is_dir());
        assert_eq!(fs::read_to_string(dest.join("a_good.txt")).unwrap(), "good");
        assert!(!dest.join("b_bad.txt").exists());
    }
}
