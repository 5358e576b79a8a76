// src/types.rs

use std::fmt;
use std::path::{Path, PathBuf};

/// What happened to a path between two snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Created,
    Changed,
    Deleted,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ChangeKind::Created => "Created",
            ChangeKind::Changed => "Changed",
            ChangeKind::Deleted => "Deleted",
        };
        f.write_str(s)
    }
}

/// One entry of a diff, rendered as `"<Kind> <path>"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChangeDescriptor {
    pub kind: ChangeKind,
    pub path: PathBuf,
}

impl ChangeDescriptor {
    pub fn new(kind: ChangeKind, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            path: path.into(),
        }
    }

    pub fn created(path: &Path) -> Self {
        Self::new(ChangeKind::Created, path)
    }

    pub fn changed(path: &Path) -> Self {
        Self::new(ChangeKind::Changed, path)
    }

    pub fn deleted(path: &Path) -> Self {
        Self::new(ChangeKind::Deleted, path)
    }
}

impl fmt::Display for ChangeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.path.display())
    }
}

/// Sort a batch of descriptors by their textual rendering so output is
/// reproducible across runs and platforms.
pub fn sort_changes(changes: &mut [ChangeDescriptor]) {
    changes.sort_by_cached_key(|c| c.to_string());
}

/// Which file attributes take part in fingerprint equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FingerprintPolicy {
    /// Only the content digest. Rewriting a file with identical bytes is not
    /// a change.
    #[default]
    Content,
    /// Digest plus modification time. Touching a file is a change.
    ContentAndMtime,
}

impl FingerprintPolicy {
    pub fn from_strict(strict: bool) -> Self {
        if strict {
            FingerprintPolicy::ContentAndMtime
        } else {
            FingerprintPolicy::Content
        }
    }
}
