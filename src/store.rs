//! Content-addressable object store
//!
//! The store persists immutable, hash-identified nodes in three logical
//! relations, backed by one [sled](https://docs.rs/sled) database:
//!
//! ```text
//! nodes     hash (32 bytes)            -> kind (1 byte: file / directory)
//! contents  hash (32 bytes)            -> raw file bytes
//! edges     parent hash ++ child name  -> child hash (32 bytes)
//! ```
//!
//! The `edges` key layout is what makes path resolution cheap: looking up a
//! child is a single point read on `parent ++ name`, and enumerating a
//! directory is a prefix scan on `parent`; sled's byte-ordered keys return
//! the children already sorted by name. No operation ever scans the whole
//! edge relation.
//!
//! ## Deduplication and atomicity
//!
//! Nodes are deduplicated at whole-node granularity: inserting a hash that
//! is already present is a no-op. The kind record in `nodes` is written
//! last, after content and edges, and idempotency checks key off `nodes`,
//! so a crash mid-insert can never leave a visible half-node, only orphan
//! rows that the next identical insert completes. Every mutating call
//! flushes sled before returning.
//!
//! ## Example
//!
//! ```rust,no_run
//! use merkledir::store::{ObjectStore, NodeKind};
//!
//! # fn main() -> merkledir::Result<()> {
//! let store = ObjectStore::open("./.merkledir")?;
//!
//! let file = store.put_file(b"hello")?;
//! let root = store.put_directory(&[("greeting.txt".to_string(), file)])?;
//!
//! assert_eq!(store.kind_of(&root)?, NodeKind::Directory);
//! assert_eq!(store.child_by_name(&root, "greeting.txt")?, Some(file));
//! # Ok(())
//! # }
//! ```

use crate::error::{MerkleDirError, Result};
use crate::hash::{encode_directory, hash_bytes, Hash256, HASH_LEN};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, trace};

const NODES_TREE: &str = "nodes";
const CONTENTS_TREE: &str = "contents";
const EDGES_TREE: &str = "edges";

const KIND_DIRECTORY: u8 = 0;
const KIND_FILE: u8 = 1;

/// The two node kinds the data model recognizes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// Regular file owning an immutable byte sequence
    File,
    /// Directory owning an ordered-by-name set of (name, child hash) pairs
    Directory,
}

impl NodeKind {
    fn to_byte(self) -> u8 {
        match self {
            NodeKind::Directory => KIND_DIRECTORY,
            NodeKind::File => KIND_FILE,
        }
    }

    fn from_byte(byte: u8) -> Result<Self> {
        match byte {
            KIND_DIRECTORY => Ok(NodeKind::Directory),
            KIND_FILE => Ok(NodeKind::File),
            other => Err(MerkleDirError::corrupt(format!(
                "unknown node kind byte {other:#04x}"
            ))),
        }
    }
}

/// Store metadata persisted as `metadata.json` beside the database
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreMetadata {
    /// On-disk format version
    pub format_version: u32,
    /// Version of merkledir that created the store
    pub merkledir_version: String,
    /// When the store was created
    pub created_at: DateTime<Utc>,
    /// When the store was last opened
    pub last_opened: DateTime<Utc>,
}

/// Counters describing the current state of a store
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StoreStats {
    /// Number of nodes (files + directories)
    pub node_count: usize,
    /// Number of distinct file content rows
    pub content_count: usize,
    /// Number of parent→child edges
    pub edge_count: usize,
    /// Bytes the database occupies on disk
    pub size_on_disk: u64,
}

/// Durable, deduplicating store of hash-identified tree nodes
///
/// Nodes are created exactly once, never mutated, never deleted (there is no
/// garbage collection). Many directories may reference the same child hash;
/// the store, not any directory, owns every node.
pub struct ObjectStore {
    db: sled::Db,
    nodes: sled::Tree,
    contents: sled::Tree,
    edges: sled::Tree,
    root: PathBuf,
}

impl std::fmt::Debug for ObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectStore")
            .field("root", &self.root)
            .finish()
    }
}

impl ObjectStore {
    /// Open a store at `root`, creating it if it does not exist
    ///
    /// The sled database lives under `root/db`; `root/metadata.json` records
    /// the format version and creation time, and its `last_opened` stamp is
    /// refreshed on every open.
    ///
    /// # Errors
    ///
    /// - [`MerkleDirError::Io`] if the directory cannot be created
    /// - [`MerkleDirError::Sled`] if the database cannot be opened
    /// - [`MerkleDirError::Json`] if existing metadata is unreadable
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;

        let db = sled::open(root.join("db"))?;
        let nodes = db.open_tree(NODES_TREE)?;
        let contents = db.open_tree(CONTENTS_TREE)?;
        let edges = db.open_tree(EDGES_TREE)?;

        let metadata_path = root.join("metadata.json");
        let mut metadata = if metadata_path.exists() {
            serde_json::from_str::<StoreMetadata>(&fs::read_to_string(&metadata_path)?)?
        } else {
            StoreMetadata {
                format_version: 1,
                merkledir_version: env!("CARGO_PKG_VERSION").to_string(),
                created_at: Utc::now(),
                last_opened: Utc::now(),
            }
        };
        metadata.last_opened = Utc::now();
        fs::write(&metadata_path, serde_json::to_string_pretty(&metadata)?)?;

        info!("opened object store at {:?}", root);

        Ok(Self {
            db,
            nodes,
            contents,
            edges,
            root,
        })
    }

    /// Insert a file node, returning its content hash
    ///
    /// Idempotent: if the hash is already present nothing is written and the
    /// existing hash is returned. On first insert the content row is written
    /// before the kind record, and sled is flushed before returning.
    pub fn put_file(&self, content: &[u8]) -> Result<Hash256> {
        let hash = hash_bytes(content);
        if self.nodes.contains_key(hash.as_bytes())? {
            trace!("file {} already stored", hash.short());
            return Ok(hash);
        }

        self.contents.insert(hash.as_bytes(), content)?;
        self.nodes
            .insert(hash.as_bytes(), vec![NodeKind::File.to_byte()])?;
        self.db.flush()?;

        debug!("stored file {} ({} bytes)", hash.short(), content.len());
        Ok(hash)
    }

    /// Insert a directory node, returning its canonical hash
    ///
    /// Child names must be unique; child hashes are trusted to exist, since
    /// snapshots insert bottom-up and every child precedes its parent.
    /// Idempotent like [`put_file`](Self::put_file): an already-present hash
    /// writes nothing.
    ///
    /// # Errors
    ///
    /// - [`MerkleDirError::DuplicateName`] if two children share a name
    pub fn put_directory(&self, children: &[(String, Hash256)]) -> Result<Hash256> {
        let mut seen = HashSet::with_capacity(children.len());
        for (name, _) in children {
            if !seen.insert(name.as_str()) {
                return Err(MerkleDirError::DuplicateName(name.clone()));
            }
        }

        let hash = hash_bytes(&encode_directory(children));
        if self.nodes.contains_key(hash.as_bytes())? {
            trace!("directory {} already stored", hash.short());
            return Ok(hash);
        }

        for (name, child) in children {
            self.edges
                .insert(edge_key(&hash, name), child.as_bytes().as_slice())?;
        }
        self.nodes
            .insert(hash.as_bytes(), vec![NodeKind::Directory.to_byte()])?;
        self.db.flush()?;

        debug!(
            "stored directory {} ({} children)",
            hash.short(),
            children.len()
        );
        Ok(hash)
    }

    /// Look up the kind of a node
    ///
    /// # Errors
    ///
    /// - [`MerkleDirError::NotFound`] if the hash is absent
    pub fn kind_of(&self, hash: &Hash256) -> Result<NodeKind> {
        match self.nodes.get(hash.as_bytes())? {
            Some(value) => match value.as_ref() {
                [byte] => NodeKind::from_byte(*byte),
                other => Err(MerkleDirError::corrupt(format!(
                    "node record for {hash} has {} bytes, expected 1",
                    other.len()
                ))),
            },
            None => Err(MerkleDirError::NotFound(*hash)),
        }
    }

    /// Load the content bytes of a file node
    ///
    /// # Errors
    ///
    /// - [`MerkleDirError::NotFound`] if the hash is absent
    /// - [`MerkleDirError::WrongKind`] if the hash names a directory
    pub fn content_of(&self, hash: &Hash256) -> Result<Vec<u8>> {
        match self.kind_of(hash)? {
            NodeKind::File => {}
            actual @ NodeKind::Directory => {
                return Err(MerkleDirError::WrongKind {
                    hash: *hash,
                    expected: NodeKind::File,
                    actual,
                })
            }
        }
        let content = self
            .contents
            .get(hash.as_bytes())?
            .ok_or_else(|| MerkleDirError::corrupt(format!("file node {hash} has no content row")))?;
        trace!("loaded content {} ({} bytes)", hash.short(), content.len());
        Ok(content.to_vec())
    }

    /// Enumerate a directory's children, ordered by name
    ///
    /// A prefix scan over the edge index; cost is proportional to the
    /// directory's own fan-out, never to the size of the store.
    ///
    /// # Errors
    ///
    /// - [`MerkleDirError::NotFound`] if the hash is absent
    /// - [`MerkleDirError::WrongKind`] if the hash names a file
    pub fn children_of(&self, hash: &Hash256) -> Result<Vec<(String, Hash256)>> {
        match self.kind_of(hash)? {
            NodeKind::Directory => {}
            actual @ NodeKind::File => {
                return Err(MerkleDirError::WrongKind {
                    hash: *hash,
                    expected: NodeKind::Directory,
                    actual,
                })
            }
        }

        let mut children = Vec::new();
        for entry in self.edges.scan_prefix(hash.as_bytes()) {
            let (key, value) = entry?;
            let name = String::from_utf8(key[HASH_LEN..].to_vec())?;
            let child = Hash256::from_slice(&value).ok_or_else(|| {
                MerkleDirError::corrupt(format!("edge {hash}/{name} has a malformed child hash"))
            })?;
            children.push((name, child));
        }
        Ok(children)
    }

    /// Resolve one child of a directory by name
    ///
    /// A single indexed point lookup. Absence is `Ok(None)`, never an error;
    /// the parent's own existence is not checked; a hash with no edges
    /// simply has no children.
    pub fn child_by_name(&self, parent: &Hash256, name: &str) -> Result<Option<Hash256>> {
        match self.edges.get(edge_key(parent, name))? {
            Some(value) => {
                let child = Hash256::from_slice(&value).ok_or_else(|| {
                    MerkleDirError::corrupt(format!(
                        "edge {parent}/{name} has a malformed child hash"
                    ))
                })?;
                Ok(Some(child))
            }
            None => Ok(None),
        }
    }

    /// Check whether a node is present
    pub fn contains(&self, hash: &Hash256) -> Result<bool> {
        Ok(self.nodes.contains_key(hash.as_bytes())?)
    }

    /// Current row counts and on-disk size
    pub fn stats(&self) -> Result<StoreStats> {
        Ok(StoreStats {
            node_count: self.nodes.len(),
            content_count: self.contents.len(),
            edge_count: self.edges.len(),
            size_on_disk: self.db.size_on_disk()?,
        })
    }

    /// Store root path
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Handle to the contents tree for lazy diff sides.
    ///
    /// sled trees are internally reference-counted, so the clone shares the
    /// underlying database.
    pub(crate) fn contents_handle(&self) -> sled::Tree {
        self.contents.clone()
    }
}

/// Edge key layout: parent hash bytes followed by the raw name bytes.
fn edge_key(parent: &Hash256, name: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(HASH_LEN + name.len());
    key.extend_from_slice(parent.as_bytes());
    key.extend_from_slice(name.as_bytes());
    key
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open_store() -> (ObjectStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = ObjectStore::open(dir.path().join("store")).unwrap();
        (store, dir)
    }

    #[test]
    fn test_put_and_read_file() {
        let (store, _dir) = open_store();
        let hash = store.put_file(b"hello world").unwrap();

        assert_eq!(store.kind_of(&hash).unwrap(), NodeKind::File);
        assert_eq!(store.content_of(&hash).unwrap(), b"hello world");
        assert!(store.contains(&hash).unwrap());
    }

    #[test]
    fn test_put_file_is_idempotent() {
        let (store, _dir) = open_store();
        let h1 = store.put_file(b"same bytes").unwrap();
        let before = store.stats().unwrap();
        let h2 = store.put_file(b"same bytes").unwrap();
        let after = store.stats().unwrap();

        assert_eq!(h1, h2);
        assert_eq!(before.node_count, after.node_count);
        assert_eq!(before.content_count, after.content_count);
    }

    #[test]
    fn test_put_directory_and_children() {
        let (store, _dir) = open_store();
        let a = store.put_file(b"aaa").unwrap();
        let b = store.put_file(b"bbb").unwrap();
        // Insertion order should not matter for hash or listing order.
        let dir = store
            .put_directory(&[("zeta".to_string(), b), ("alpha".to_string(), a)])
            .unwrap();

        assert_eq!(store.kind_of(&dir).unwrap(), NodeKind::Directory);
        let children = store.children_of(&dir).unwrap();
        assert_eq!(
            children,
            vec![("alpha".to_string(), a), ("zeta".to_string(), b)]
        );
    }

    #[test]
    fn test_child_by_name_point_lookup() {
        let (store, _dir) = open_store();
        let a = store.put_file(b"aaa").unwrap();
        let dir = store.put_directory(&[("a.txt".to_string(), a)]).unwrap();

        assert_eq!(store.child_by_name(&dir, "a.txt").unwrap(), Some(a));
        assert_eq!(store.child_by_name(&dir, "missing").unwrap(), None);
        // A file hash has no edges; absence, not error.
        assert_eq!(store.child_by_name(&a, "anything").unwrap(), None);
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let (store, _dir) = open_store();
        let a = store.put_file(b"aaa").unwrap();
        let err = store
            .put_directory(&[("x".to_string(), a), ("x".to_string(), a)])
            .unwrap_err();
        assert!(matches!(err, MerkleDirError::DuplicateName(name) if name == "x"));
    }

    #[test]
    fn test_wrong_kind_errors() {
        let (store, _dir) = open_store();
        let file = store.put_file(b"content").unwrap();
        let dir = store.put_directory(&[("f".to_string(), file)]).unwrap();

        assert!(matches!(
            store.content_of(&dir).unwrap_err(),
            MerkleDirError::WrongKind { .. }
        ));
        assert!(matches!(
            store.children_of(&file).unwrap_err(),
            MerkleDirError::WrongKind { .. }
        ));
    }

    #[test]
    fn test_missing_hash_is_not_found() {
        let (store, _dir) = open_store();
        let ghost = hash_bytes(b"never stored");
        assert!(store.kind_of(&ghost).unwrap_err().is_not_found());
        assert!(store.content_of(&ghost).unwrap_err().is_not_found());
        assert!(!store.contains(&ghost).unwrap());
    }

    #[test]
    fn test_reopen_preserves_nodes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store");
        let hash = {
            let store = ObjectStore::open(&path).unwrap();
            store.put_file(b"durable").unwrap()
        };
        let store = ObjectStore::open(&path).unwrap();
        assert_eq!(store.content_of(&hash).unwrap(), b"durable");
    }

    #[test]
    fn test_shared_child_between_directories() {
        let (store, _dir) = open_store();
        let shared = store.put_file(b"same content").unwrap();
        let d1 = store.put_directory(&[("x.txt".to_string(), shared)]).unwrap();
        let d2 = store.put_directory(&[("y.txt".to_string(), shared)]).unwrap();

        assert_ne!(d1, d2);
        let stats = store.stats().unwrap();
        // One content row despite two referencing directories.
        assert_eq!(stats.content_count, 1);
    }
}
