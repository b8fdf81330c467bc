//! Content hashing and the canonical directory encoding
//!
//! Every node in the store is identified by a SHA-256 digest of its canonical
//! byte representation:
//!
//! - a file node hashes its raw content bytes directly;
//! - a directory node hashes its *canonical encoding*: the `(name, hash)`
//!   pairs sorted byte-lexicographically by name, one line per pair in the
//!   form `<lowercase hex child hash><space><name><newline>`.
//!
//! The encoding is what makes directory hashes independent of enumeration
//! order, which in turn makes snapshots of identical trees deterministic no
//! matter how the filesystem happens to list them.
//!
//! ## Example
//!
//! ```rust
//! use merkledir::hash::{hash_bytes, encode_directory, Hash256};
//!
//! let child = hash_bytes(b"hello");
//! let encoded = encode_directory(&[("greeting.txt".to_string(), child)]);
//! let dir_hash: Hash256 = hash_bytes(&encoded);
//! assert_ne!(dir_hash, child);
//! ```

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

/// Number of bytes in a [`Hash256`].
pub const HASH_LEN: usize = 32;

/// A 256-bit content hash identifying a node in the store
///
/// Hashes are passed around as raw 32-byte values at the API boundary and
/// rendered as lowercase hex for display and for the canonical directory
/// encoding.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Hash256([u8; HASH_LEN]);

impl Hash256 {
    /// Wrap a raw 32-byte digest.
    pub fn from_bytes(bytes: [u8; HASH_LEN]) -> Self {
        Self(bytes)
    }

    /// Interpret a byte slice as a hash.
    ///
    /// Returns `None` unless the slice is exactly 32 bytes long. Used when
    /// reading raw keys and values back out of the store.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let arr: [u8; HASH_LEN] = bytes.try_into().ok()?;
        Some(Self(arr))
    }

    /// Raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; HASH_LEN] {
        &self.0
    }

    /// Lowercase hex rendering (64 characters).
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// First eight hex characters, for log lines.
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl fmt::Display for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash256({})", self.short())
    }
}

impl FromStr for Hash256 {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut arr = [0u8; HASH_LEN];
        hex::decode_to_slice(s, &mut arr)?;
        Ok(Self(arr))
    }
}

/// Compute the SHA-256 digest of a byte sequence
///
/// Pure and deterministic; this is the only place a digest is ever computed.
pub fn hash_bytes(content: &[u8]) -> Hash256 {
    let mut hasher = Sha256::new();
    hasher.update(content);
    Hash256(hasher.finalize().into())
}

/// Produce the canonical byte encoding of a directory's child list
///
/// Sorts the pairs byte-lexicographically by name (callers need not
/// pre-sort) and emits one `<hex hash> <name>\n` line per child. Hashing the
/// returned bytes yields the directory's node hash.
pub fn encode_directory(children: &[(String, Hash256)]) -> Vec<u8> {
    let mut sorted: Vec<&(String, Hash256)> = children.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(&b.0));

    let mut encoded = Vec::with_capacity(sorted.len() * (HASH_LEN * 2 + 2));
    for (name, hash) in sorted {
        encoded.extend_from_slice(hash.to_hex().as_bytes());
        encoded.push(b' ');
        encoded.extend_from_slice(name.as_bytes());
        encoded.push(b'\n');
    }
    encoded
}
