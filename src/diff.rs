//! Recursive, dedup-aware tree diffing
//!
//! Computes a path-keyed map of per-file differences between two stored
//! trees ([`diff`]) or between a stored tree and a live directory
//! ([`diff_path`]). Both entry points share one policy:
//!
//! 1. Sides with the identical hash contribute nothing and are never
//!    recursed into; structural sharing is what keeps diffs over
//!    mostly-unchanged trees cheap, regardless of file sizes beneath.
//! 2. When either side of a matched path is a file, one [`Diff`] entry is
//!    emitted at that path. A directory standing in place of a file counts
//!    as absent there; its presence shows up only through entries for the
//!    file paths beneath it.
//! 3. Children are matched by name; names on one side only expand into
//!    pure-addition or pure-removal entries for every file beneath.
//! 4. Directory-vs-directory paths never appear as map keys.
//!
//! Content is carried lazily: a [`Diff`] holds a handle per side (a stored
//! hash or a live path) and bytes are only read when an accessor is called.
//! Diffing two large, mostly-shared trees and rendering a single small
//! file's change reads only that file.

use crate::error::{MerkleDirError, Result};
use crate::hash::{hash_bytes, Hash256};
use crate::store::{NodeKind, ObjectStore};
use crate::textdiff::unified_diff;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};
use walkdir::WalkDir;

/// Map of slash-joined relative file paths to their per-file difference
///
/// Empty means the two trees are behaviorally identical for every file.
pub type DiffMap = BTreeMap<String, Diff>;

/// Where a diff side's bytes come from when they are actually requested.
#[derive(Debug, Clone)]
enum ContentSource {
    /// File node in the store; the tree handle shares the open database.
    Stored { contents: sled::Tree, hash: Hash256 },
    /// Live file on disk, re-read on access.
    Live(PathBuf),
}

impl ContentSource {
    fn load(&self) -> Result<Vec<u8>> {
        match self {
            ContentSource::Stored { contents, hash } => {
                let value = contents
                    .get(hash.as_bytes())?
                    .ok_or(MerkleDirError::NotFound(*hash))?;
                Ok(value.to_vec())
            }
            ContentSource::Live(path) => Ok(fs::read(path)?),
        }
    }
}

/// One file path's state across the two sides of a diff
///
/// Exactly one of three shapes: only a new side (`is_new`), only an old
/// side (`is_removed`), or both (`is_changed`; equal content never
/// produces an entry).
#[derive(Debug, Clone)]
pub struct Diff {
    old: Option<ContentSource>,
    new: Option<ContentSource>,
}

impl Diff {
    /// Present only on the new side
    pub fn is_new(&self) -> bool {
        self.old.is_none() && self.new.is_some()
    }

    /// Present only on the old side
    pub fn is_removed(&self) -> bool {
        self.old.is_some() && self.new.is_none()
    }

    /// Present on both sides with differing content
    pub fn is_changed(&self) -> bool {
        self.old.is_some() && self.new.is_some()
    }

    /// Fetch the old side's bytes
    ///
    /// # Errors
    ///
    /// - [`MerkleDirError::NoSuchSide`] if the file has no old side
    pub fn old_content(&self) -> Result<Vec<u8>> {
        self.old
            .as_ref()
            .ok_or(MerkleDirError::NoSuchSide("old"))?
            .load()
    }

    /// Fetch the new side's bytes
    ///
    /// # Errors
    ///
    /// - [`MerkleDirError::NoSuchSide`] if the file has no new side
    pub fn new_content(&self) -> Result<Vec<u8>> {
        self.new
            .as_ref()
            .ok_or(MerkleDirError::NoSuchSide("new"))?
            .load()
    }

    /// Render the change as unified-diff text
    ///
    /// Assumes both sides are UTF-8 text; keeping binary content away from
    /// this is the caller's responsibility.
    ///
    /// # Errors
    ///
    /// - [`MerkleDirError::NotComparable`] unless both sides are present
    /// - [`MerkleDirError::Utf8`] if either side is not valid UTF-8
    pub fn unified(&self) -> Result<String> {
        if self.old.is_none() || self.new.is_none() {
            return Err(MerkleDirError::NotComparable);
        }
        let old_text = String::from_utf8(self.old_content()?)?;
        let new_text = String::from_utf8(self.new_content()?)?;
        Ok(unified_diff(&old_text, &new_text))
    }
}

/// Diff two stored trees
///
/// Both hashes must be present in the store; a missing hash is
/// [`NotFound`](MerkleDirError::NotFound). `diff(h, h)` is always empty.
pub fn diff(store: &ObjectStore, old: &Hash256, new: &Hash256) -> Result<DiffMap> {
    let mut map = DiffMap::new();
    diff_stored(store, *old, *new, "", &mut map)?;
    debug!(
        "diff {} -> {}: {} entries",
        old.short(),
        new.short(),
        map.len()
    );
    Ok(map)
}

/// Diff a stored tree against a live filesystem tree
///
/// The old side is resolved through the store, the new side through
/// `stat`/read on disk. Unchanged files are detected by hashing the live
/// bytes against the stored hash, so stored content for unchanged paths is
/// never read.
///
/// # Errors
///
/// - [`MerkleDirError::NotFound`] if `old` is absent from the store
/// - [`MerkleDirError::InvalidEntry`] if `live` does not exist or the live
///   subtree contains an entry that is neither file nor directory
pub fn diff_path(store: &ObjectStore, old: &Hash256, live: impl AsRef<Path>) -> Result<DiffMap> {
    let live = live.as_ref();
    if fs::symlink_metadata(live).is_err() {
        return Err(MerkleDirError::InvalidEntry(live.to_path_buf()));
    }
    let mut map = DiffMap::new();
    diff_live(store, *old, live, "", &mut map)?;
    debug!("diff {} -> {:?}: {} entries", old.short(), live, map.len());
    Ok(map)
}

fn join_path(base: &str, name: &str) -> String {
    if base.is_empty() {
        name.to_string()
    } else {
        format!("{base}/{name}")
    }
}

fn stored_source(store: &ObjectStore, hash: Hash256) -> ContentSource {
    ContentSource::Stored {
        contents: store.contents_handle(),
        hash,
    }
}

fn diff_stored(
    store: &ObjectStore,
    old: Hash256,
    new: Hash256,
    path: &str,
    out: &mut DiffMap,
) -> Result<()> {
    if old == new {
        trace!("shared subtree {} at {:?}, skipping", old.short(), path);
        return Ok(());
    }

    let old_kind = store.kind_of(&old)?;
    let new_kind = store.kind_of(&new)?;

    if old_kind == NodeKind::File || new_kind == NodeKind::File {
        // Differing hashes imply differing bytes under content addressing,
        // so a file-vs-file pair here is always a real change.
        out.insert(
            path.to_string(),
            Diff {
                old: (old_kind == NodeKind::File).then(|| stored_source(store, old)),
                new: (new_kind == NodeKind::File).then(|| stored_source(store, new)),
            },
        );
    }

    let old_children = match old_kind {
        NodeKind::Directory => store.children_of(&old)?,
        NodeKind::File => Vec::new(),
    };
    let new_children: BTreeMap<String, Hash256> = match new_kind {
        NodeKind::Directory => store.children_of(&new)?.into_iter().collect(),
        NodeKind::File => BTreeMap::new(),
    };

    let mut matched: Vec<&str> = Vec::new();
    for (name, old_child) in &old_children {
        match new_children.get(name) {
            Some(new_child) => {
                matched.push(name.as_str());
                diff_stored(store, *old_child, *new_child, &join_path(path, name), out)?;
            }
            None => collect_stored(store, *old_child, Side::Old, &join_path(path, name), out)?,
        }
    }
    for (name, new_child) in &new_children {
        if !matched.contains(&name.as_str()) {
            collect_stored(store, *new_child, Side::New, &join_path(path, name), out)?;
        }
    }
    Ok(())
}

#[derive(Clone, Copy)]
enum Side {
    Old,
    New,
}

/// Expand an unmatched stored subtree into pure-addition or pure-removal
/// entries, one per file beneath it.
fn collect_stored(
    store: &ObjectStore,
    hash: Hash256,
    side: Side,
    path: &str,
    out: &mut DiffMap,
) -> Result<()> {
    match store.kind_of(&hash)? {
        NodeKind::File => {
            let source = Some(stored_source(store, hash));
            let entry = match side {
                Side::Old => Diff {
                    old: source,
                    new: None,
                },
                Side::New => Diff {
                    old: None,
                    new: source,
                },
            };
            out.insert(path.to_string(), entry);
        }
        NodeKind::Directory => {
            for (name, child) in store.children_of(&hash)? {
                collect_stored(store, child, side, &join_path(path, &name), out)?;
            }
        }
    }
    Ok(())
}

fn diff_live(
    store: &ObjectStore,
    old: Hash256,
    live: &Path,
    path: &str,
    out: &mut DiffMap,
) -> Result<()> {
    let old_kind = store.kind_of(&old)?;
    let live_type = fs::symlink_metadata(live)?.file_type();
    if !live_type.is_file() && !live_type.is_dir() {
        return Err(MerkleDirError::InvalidEntry(live.to_path_buf()));
    }

    if live_type.is_file() {
        let live_bytes = fs::read(live)?;
        // The equality check: identical bytes despite both sides existing.
        if old_kind == NodeKind::File && hash_bytes(&live_bytes) == old {
            return Ok(());
        }
        out.insert(
            path.to_string(),
            Diff {
                old: (old_kind == NodeKind::File).then(|| stored_source(store, old)),
                new: Some(ContentSource::Live(live.to_path_buf())),
            },
        );
    } else if old_kind == NodeKind::File {
        // File replaced by a directory: the file is removed here, and the
        // directory reports itself through the additions beneath it.
        out.insert(
            path.to_string(),
            Diff {
                old: Some(stored_source(store, old)),
                new: None,
            },
        );
    }

    let old_children: Vec<(String, Hash256)> = match old_kind {
        NodeKind::Directory => store.children_of(&old)?,
        NodeKind::File => Vec::new(),
    };

    let mut live_names: Vec<String> = Vec::new();
    if live_type.is_dir() {
        for entry in fs::read_dir(live)? {
            let name = entry?
                .file_name()
                .into_string()
                .map_err(MerkleDirError::PathConversion)?;
            live_names.push(name);
        }
    }

    for (name, old_child) in &old_children {
        let child_path = join_path(path, name);
        if live_names.iter().any(|n| n == name) {
            diff_live(store, *old_child, &live.join(name), &child_path, out)?;
        } else {
            collect_stored(store, *old_child, Side::Old, &child_path, out)?;
        }
    }
    for name in &live_names {
        if !old_children.iter().any(|(n, _)| n == name) {
            collect_live(&live.join(name), &join_path(path, name), out)?;
        }
    }
    Ok(())
}

/// Expand an unmatched live subtree into pure-addition entries.
fn collect_live(live: &Path, path: &str, out: &mut DiffMap) -> Result<()> {
    for entry in WalkDir::new(live).sort_by_file_name() {
        let entry = entry.map_err(|e| match e.into_io_error() {
            Some(io) => MerkleDirError::Io(io),
            None => MerkleDirError::InvalidEntry(live.to_path_buf()),
        })?;
        let file_type = entry.file_type();
        if file_type.is_dir() {
            continue;
        }
        if !file_type.is_file() {
            return Err(MerkleDirError::InvalidEntry(entry.path().to_path_buf()));
        }

        let mut rel = path.to_string();
        if entry.path() != live {
            let suffix = entry
                .path()
                .strip_prefix(live)
                .expect("walkdir yields paths under its root");
            for component in suffix.components() {
                let name = component
                    .as_os_str()
                    .to_str()
                    .ok_or_else(|| {
                        MerkleDirError::PathConversion(component.as_os_str().to_os_string())
                    })?;
                rel = join_path(&rel, name);
            }
        }
        out.insert(
            rel,
            Diff {
                old: None,
                new: Some(ContentSource::Live(entry.path().to_path_buf())),
            },
        );
    }
    Ok(())
}
