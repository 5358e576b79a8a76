// src/watch/watch_set.rs

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use tracing::debug;

use crate::fs::{FileSystem, RealFileSystem};
use crate::types::{ChangeDescriptor, FingerprintPolicy, sort_changes};
use crate::watch::hash::Fingerprint;
use crate::watch::patterns::IgnoreSet;
use crate::watch::snapshot::{TreeSnapshot, diff_fingerprints};

/// Authoritative record of everything being watched.
///
/// Built once from already-normalized paths; [`WatchSet::update`] rescans
/// all of it and reports what differs from the previous scan. This is the
/// expensive ground truth: it costs one read of every watched file.
#[derive(Debug)]
pub struct WatchSet {
    fs: Arc<dyn FileSystem>,
    policy: FingerprintPolicy,
    ignore: IgnoreSet,
    explicit_files: BTreeMap<PathBuf, Fingerprint>,
    dir_snapshots: BTreeMap<PathBuf, TreeSnapshot>,
}

impl WatchSet {
    /// Watch set over the real filesystem.
    pub fn new(
        files: &[PathBuf],
        dirs: &[PathBuf],
        ignore: IgnoreSet,
        policy: FingerprintPolicy,
    ) -> Self {
        Self::with_fs(Arc::new(RealFileSystem), files, dirs, ignore, policy)
    }

    pub fn with_fs(
        fs: Arc<dyn FileSystem>,
        files: &[PathBuf],
        dirs: &[PathBuf],
        ignore: IgnoreSet,
        policy: FingerprintPolicy,
    ) -> Self {
        let explicit_files = scan_files(fs.as_ref(), files.iter(), policy);
        let dir_snapshots = scan_dirs(fs.as_ref(), dirs.iter(), &ignore, policy);

        Self {
            fs,
            policy,
            ignore,
            explicit_files,
            dir_snapshots,
        }
    }

    /// Rescan every watched path, replace the stored state and return the
    /// sorted list of differences (empty when nothing changed).
    pub fn update(&mut self) -> Vec<ChangeDescriptor> {
        let started = Instant::now();

        let files = scan_files(self.fs.as_ref(), self.explicit_files.keys(), self.policy);
        let dirs = scan_dirs(
            self.fs.as_ref(),
            self.dir_snapshots.keys(),
            &self.ignore,
            self.policy,
        );

        let mut changes = Vec::new();
        diff_fingerprints(&self.explicit_files, &files, &mut changes);
        for (root, new) in &dirs {
            if let Some(old) = self.dir_snapshots.get(root) {
                changes.extend(TreeSnapshot::diff(old, new));
            }
        }
        sort_changes(&mut changes);
        // Explicit files living inside a watched directory show up twice.
        changes.dedup();

        self.explicit_files = files;
        self.dir_snapshots = dirs;

        debug!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            changes = changes.len(),
            "watch set updated"
        );
        changes
    }

    pub fn files(&self) -> impl Iterator<Item = &Path> {
        self.explicit_files.keys().map(PathBuf::as_path)
    }

    pub fn dirs(&self) -> impl Iterator<Item = &Path> {
        self.dir_snapshots.keys().map(PathBuf::as_path)
    }

    pub fn ignore(&self) -> &IgnoreSet {
        &self.ignore
    }

    pub fn fingerprint_of(&self, file: &Path) -> Option<&Fingerprint> {
        self.explicit_files.get(file)
    }

    pub fn snapshot_of(&self, dir: &Path) -> Option<&TreeSnapshot> {
        self.dir_snapshots.get(dir)
    }
}

fn scan_files<'a>(
    fs: &dyn FileSystem,
    files: impl Iterator<Item = &'a PathBuf>,
    policy: FingerprintPolicy,
) -> BTreeMap<PathBuf, Fingerprint> {
    files
        .map(|f| (f.clone(), Fingerprint::compute(fs, f, policy)))
        .collect()
}

fn scan_dirs<'a>(
    fs: &dyn FileSystem,
    dirs: impl Iterator<Item = &'a PathBuf>,
    ignore: &IgnoreSet,
    policy: FingerprintPolicy,
) -> BTreeMap<PathBuf, TreeSnapshot> {
    dirs.map(|d| (d.clone(), TreeSnapshot::build(fs, d, ignore, policy)))
        .collect()
}
