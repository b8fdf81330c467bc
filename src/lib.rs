//! # merkledir - Content-addressable Merkle store for directory trees
//!
//! merkledir snapshots filesystem subtrees into a durable, deduplicating
//! object store where every node, file or directory, is identified by a
//! SHA-256 hash of its canonical byte form. A whole tree is one hash.
//!
//! On top of that data model it provides:
//!
//! - **Snapshots**: depth-first, bottom-up ingestion; unchanged files and
//!   whole unchanged subtrees deduplicate to already-stored nodes
//! - **Structural diffs**: file-granular comparison of two snapshots, or of
//!   a snapshot against a live directory, that never traverses (or reads)
//!   subtrees shared by both sides
//! - **Materialization**: writing a snapshot back out as real files and
//!   directories
//! - **Path resolution**: hash lookup by `a/b/c` path in time proportional
//!   to path depth, via an indexed `(parent, name)` edge relation
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use merkledir::MerkleDir;
//!
//! # fn main() -> merkledir::Result<()> {
//! let md = MerkleDir::open("./.merkledir")?;
//!
//! // Snapshot a directory; the returned hash names the whole tree.
//! let v1 = md.store("./project")?;
//!
//! // ... edit some files ...
//! let v2 = md.store("./project")?;
//!
//! // File-granular diff; unchanged subtrees are skipped outright.
//! for (path, entry) in md.diff(&v1, &v2)? {
//!     if entry.is_changed() {
//!         println!("{path}:\n{}", entry.unified()?);
//!     }
//! }
//!
//! // Materialize v1 somewhere else (the target must not exist).
//! assert!(md.fetch(&v1, "./project-v1"));
//!
//! // Resolve a path inside a snapshot without walking the tree.
//! let readme = md.find(&v1, "README.md")?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Data model
//!
//! A file node hashes its raw bytes; a directory node hashes the canonical
//! encoding of its sorted `(name, child hash)` list (see [`hash`]). Equal
//! content means equal hash means one stored copy, however many snapshots
//! or sibling directories reference it. Nodes are immutable and never
//! deleted; there is no garbage collection.
//!
//! The store keeps three relations in one embedded [sled](https://docs.rs/sled)
//! database: node kinds by hash, file contents by hash, and directory edges
//! keyed by `(parent hash, child name)`, the index that makes
//! [`find`](MerkleDir::find) cost one point lookup per path component.
//!
//! ## Scope
//!
//! Exactly two node kinds exist: regular files and directories. Symlinks,
//! permission bits, chunking of large files, and multi-writer coordination
//! are out of scope. Operations are synchronous and single-threaded;
//! concurrent snapshots into one store are harmless only because every
//! mutation is an idempotent insert keyed by content hash.
//!
//! ## Module Organization
//!
//! - [`merkledir`]: the [`MerkleDir`] facade
//! - [`hash`]: digests and the canonical directory encoding
//! - [`store`]: the sled-backed object store
//! - [`snapshot`]: filesystem → store ingestion
//! - [`navigate`]: path resolution
//! - [`diff`]: tree diffing and the [`Diff`] type
//! - [`materialize`]: store → filesystem extraction
//! - [`error`]: error types

pub mod diff;
pub mod error;
pub mod hash;
pub mod materialize;
pub mod merkledir;
pub mod navigate;
pub mod snapshot;
pub mod store;
pub mod textdiff;

// Re-export main types for convenience
pub use diff::{Diff, DiffMap};
pub use error::{MerkleDirError, Result};
pub use hash::Hash256;
pub use merkledir::MerkleDir;
pub use store::{NodeKind, ObjectStore, StoreStats};
