//! The `MerkleDir` facade
//!
//! Owns an [`ObjectStore`] and exposes the five top-level operations
//! (snapshot, stored/live diff, materialize, and path resolution) as one
//! surface. The algorithms live in the component modules; this type just
//! wires them to a store.

use crate::diff::{self, DiffMap};
use crate::error::Result;
use crate::hash::Hash256;
use crate::materialize;
use crate::navigate;
use crate::snapshot;
use crate::store::{ObjectStore, StoreStats};
use std::path::Path;

/// Content-addressable Merkle store for directory trees
///
/// ## Example
///
/// ```rust,no_run
/// use merkledir::MerkleDir;
///
/// # fn main() -> merkledir::Result<()> {
/// let md = MerkleDir::open("./.merkledir")?;
///
/// let before = md.store("./project")?;
/// // ... edit files ...
/// let after = md.store("./project")?;
///
/// for (path, entry) in md.diff(&before, &after)? {
///     println!("{path}: changed={}", entry.is_changed());
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct MerkleDir {
    store: ObjectStore,
}

impl MerkleDir {
    /// Open (or create) a store at `root` and wrap it.
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        Ok(Self {
            store: ObjectStore::open(root)?,
        })
    }

    /// Wrap an already-open store.
    pub fn with_store(store: ObjectStore) -> Self {
        Self { store }
    }

    /// Snapshot a filesystem subtree; returns the root node's hash.
    ///
    /// See [`snapshot::snapshot`].
    pub fn store(&self, path: impl AsRef<Path>) -> Result<Hash256> {
        snapshot::snapshot(&self.store, path)
    }

    /// Diff two stored trees. See [`diff::diff`].
    pub fn diff(&self, old: &Hash256, new: &Hash256) -> Result<DiffMap> {
        diff::diff(&self.store, old, new)
    }

    /// Diff a stored tree against a live directory. See [`diff::diff_path`].
    pub fn diff_path(&self, old: &Hash256, live: impl AsRef<Path>) -> Result<DiffMap> {
        diff::diff_path(&self.store, old, live)
    }

    /// Materialize a stored tree at `target`; `false` on any failure.
    ///
    /// See [`materialize::fetch`].
    pub fn fetch(&self, hash: &Hash256, target: impl AsRef<Path>) -> bool {
        materialize::fetch(&self.store, hash, target)
    }

    /// Resolve a slash-separated path within a stored tree.
    ///
    /// See [`navigate::find`].
    pub fn find(&self, root: &Hash256, path: &str) -> Result<Option<Hash256>> {
        navigate::find(&self.store, root, path)
    }

    /// Row counts and on-disk size of the backing store.
    pub fn stats(&self) -> Result<StoreStats> {
        self.store.stats()
    }

    /// Direct access to the underlying store.
    pub fn store_ref(&self) -> &ObjectStore {
        &self.store
    }
}
