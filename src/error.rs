//! Error types for the merkledir library
//!
//! All fallible operations return [`Result<T>`]. The taxonomy keeps store
//! lookups (`NotFound`, `WrongKind`), snapshot validation (`InvalidEntry`,
//! `PathConversion`) and [`Diff`](crate::diff::Diff) accessor misuse
//! (`NoSuchSide`, `NotComparable`) distinct so callers can match on what
//! actually went wrong.
//!
//! The one deliberate exception is [`fetch`](crate::materialize::fetch),
//! which collapses every underlying failure into `false`: it answers "did
//! the copy succeed", not "why not".

use crate::hash::Hash256;
use crate::store::NodeKind;
use std::ffi::OsString;
use std::path::PathBuf;
use thiserror::Error;

/// Type alias for Results in the merkledir library
pub type Result<T> = std::result::Result<T, MerkleDirError>;

/// Main error type for all merkledir operations
#[derive(Debug, Error)]
pub enum MerkleDirError {
    /// I/O errors during filesystem operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Errors from the sled database backing the object store
    #[error("store backend error: {0}")]
    Sled(#[from] sled::Error),

    /// Errors serializing or deserializing store metadata
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Hash not present in the object store
    #[error("object not found: {0}")]
    NotFound(Hash256),

    /// Operation expected one node kind but found the other
    #[error("wrong node kind for {hash}: expected {expected:?}, found {actual:?}")]
    WrongKind {
        /// Hash of the offending node
        hash: Hash256,
        /// Kind the operation required
        expected: NodeKind,
        /// Kind actually recorded in the store
        actual: NodeKind,
    },

    /// Filesystem entry that is neither a regular file nor a directory
    /// (symlinks included), or a snapshot root that does not exist
    #[error("invalid filesystem entry: {0:?}")]
    InvalidEntry(PathBuf),

    /// File name that is not valid UTF-8
    #[error("path conversion error: {0:?}")]
    PathConversion(OsString),

    /// Diff accessor called for a side that is absent
    #[error("diff has no {0} content")]
    NoSuchSide(&'static str),

    /// Unified rendering requested for a diff missing one side
    #[error("cannot render a unified diff without both old and new content")]
    NotComparable,

    /// Content that is not valid UTF-8 where text was required
    #[error("UTF-8 error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    /// Malformed record read back from the store
    #[error("corrupt store record: {0}")]
    Corrupt(String),

    /// Invalid directory construction (duplicate child names)
    #[error("duplicate child name in directory: {0}")]
    DuplicateName(String),
}

impl MerkleDirError {
    /// Create a corruption error with a custom message
    pub fn corrupt(msg: impl Into<String>) -> Self {
        MerkleDirError::Corrupt(msg.into())
    }

    /// Check if this error means a hash was simply absent
    pub fn is_not_found(&self) -> bool {
        matches!(self, MerkleDirError::NotFound(_))
    }
}
