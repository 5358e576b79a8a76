// src/watch/snapshot.rs

//! Recursive, ignore-filtered snapshots of a directory tree and the
//! three-way diff between two of them.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use tracing::{debug, trace};

use crate::fs::FileSystem;
use crate::types::{ChangeDescriptor, FingerprintPolicy, sort_changes};
use crate::watch::hash::Fingerprint;
use crate::watch::patterns::IgnoreSet;

/// Record of every non-ignored file and subdirectory under `root`.
///
/// Files from the whole subtree are flattened into one map keyed by absolute
/// path. An ignored directory contributes nothing: neither itself nor any of
/// its descendants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeSnapshot {
    root: PathBuf,
    exists: bool,
    files: BTreeMap<PathBuf, Fingerprint>,
    dirs: BTreeSet<PathBuf>,
}

impl TreeSnapshot {
    /// Walk `root` and fingerprint every file that survives the ignore rules.
    ///
    /// Symlinked directories are recorded but not followed. Entries that are
    /// neither regular files nor directories (sockets, fifos) are skipped, as
    /// are files that vanish before they can be hashed.
    pub fn build(
        fs: &dyn FileSystem,
        root: &Path,
        ignore: &IgnoreSet,
        policy: FingerprintPolicy,
    ) -> Self {
        let mut snapshot = TreeSnapshot {
            root: root.to_path_buf(),
            exists: fs.is_dir(root),
            files: BTreeMap::new(),
            dirs: BTreeSet::new(),
        };

        if !snapshot.exists {
            debug!(root = ?root, "watched directory does not exist");
            return snapshot;
        }

        let mut stack = vec![root.to_path_buf()];

        while let Some(dir) = stack.pop() {
            let entries = match fs.read_dir(&dir) {
                Ok(entries) => entries,
                Err(err) => {
                    // Removed while we were walking; the next scan settles it.
                    debug!(dir = ?dir, error = %err, "could not list directory");
                    continue;
                }
            };

            for path in entries {
                if ignore.is_ignored(&path) {
                    trace!(path = ?path, "ignored");
                    continue;
                }

                if fs.is_dir(&path) {
                    if !fs.is_symlink(&path) {
                        stack.push(path.clone());
                    }
                    snapshot.dirs.insert(path);
                } else if fs.is_file(&path) {
                    let fingerprint = Fingerprint::compute(fs, &path, policy);
                    if fingerprint.is_present() {
                        snapshot.files.insert(path, fingerprint);
                    }
                }
            }
        }

        debug!(
            root = ?root,
            files = snapshot.files.len(),
            dirs = snapshot.dirs.len(),
            "built tree snapshot"
        );
        snapshot
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn exists(&self) -> bool {
        self.exists
    }

    pub fn files(&self) -> &BTreeMap<PathBuf, Fingerprint> {
        &self.files
    }

    pub fn dirs(&self) -> &BTreeSet<PathBuf> {
        &self.dirs
    }

    /// Everything that differs between `old` and `new`, sorted.
    pub fn diff(old: &TreeSnapshot, new: &TreeSnapshot) -> Vec<ChangeDescriptor> {
        let mut changes = Vec::new();

        if old == new {
            return changes;
        }

        match (old.exists, new.exists) {
            (true, false) => changes.push(ChangeDescriptor::deleted(&new.root)),
            (false, true) => changes.push(ChangeDescriptor::created(&new.root)),
            _ => {}
        }

        diff_fingerprints(&old.files, &new.files, &mut changes);

        for dir in old.dirs.difference(&new.dirs) {
            changes.push(ChangeDescriptor::deleted(dir));
        }
        for dir in new.dirs.difference(&old.dirs) {
            changes.push(ChangeDescriptor::created(dir));
        }

        sort_changes(&mut changes);
        changes
    }
}

/// Three-way comparison of two path → fingerprint maps.
///
/// An `Absent` value counts as "not there", so a path going from absent to
/// present is `Created` and the reverse is `Deleted`; only two present,
/// unequal fingerprints make a `Changed`.
pub fn diff_fingerprints(
    old: &BTreeMap<PathBuf, Fingerprint>,
    new: &BTreeMap<PathBuf, Fingerprint>,
    out: &mut Vec<ChangeDescriptor>,
) {
    for path in old.keys() {
        match (present(old, path), present(new, path)) {
            (Some(_), None) => out.push(ChangeDescriptor::deleted(path)),
            (Some(before), Some(after)) if before != after => {
                out.push(ChangeDescriptor::changed(path))
            }
            (None, Some(_)) => out.push(ChangeDescriptor::created(path)),
            _ => {}
        }
    }

    for path in new.keys().filter(|p| !old.contains_key(*p)) {
        if present(new, path).is_some() {
            out.push(ChangeDescriptor::created(path));
        }
    }
}

fn present<'a>(map: &'a BTreeMap<PathBuf, Fingerprint>, path: &Path) -> Option<&'a Fingerprint> {
    map.get(path).filter(|fp| fp.is_present())
}
