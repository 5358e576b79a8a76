// src/watch/hash.rs

use std::fmt;
use std::io::Read;
use std::path::Path;
use std::time::SystemTime;

use blake3::Hasher;
use tracing::{debug, warn};

use crate::errors::{KeepTestingError, Result};
use crate::fs::FileSystem;
use crate::types::FingerprintPolicy;

const READ_BLOCK: usize = 8192;

/// Identity of one file's content at a point in time.
///
/// Every `Absent` compares equal to every other `Absent` and unequal to any
/// present fingerprint. `modified` is only filled in under
/// [`FingerprintPolicy::ContentAndMtime`], in which case it is part of
/// equality.
#[derive(Clone, PartialEq, Eq)]
pub enum Fingerprint {
    Absent,
    Present {
        digest: blake3::Hash,
        modified: Option<SystemTime>,
    },
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fingerprint::Absent => f.write_str("Absent"),
            Fingerprint::Present { digest, modified } => f
                .debug_struct("Present")
                .field("digest", &digest.to_hex().as_str())
                .field("modified", modified)
                .finish(),
        }
    }
}

impl Fingerprint {
    /// Fingerprint `path`, treating any read failure as `Absent`.
    ///
    /// Filesystem races (a file deleted between listing and hashing, a
    /// permission flip) must never abort a scan; the next scan sees the
    /// settled state.
    pub fn compute(fs: &dyn FileSystem, path: &Path, policy: FingerprintPolicy) -> Self {
        match Self::try_compute(fs, path, policy) {
            Ok(fp) => fp,
            Err(err) => {
                warn!(path = ?path, error = %err, "transient read error; treating file as absent");
                Fingerprint::Absent
            }
        }
    }

    /// Like [`Fingerprint::compute`] but reports read failures as
    /// [`KeepTestingError::TransientRead`].
    pub fn try_compute(
        fs: &dyn FileSystem,
        path: &Path,
        policy: FingerprintPolicy,
    ) -> Result<Self> {
        if !fs.exists(path) {
            return Ok(Fingerprint::Absent);
        }

        let transient = |source| KeepTestingError::TransientRead {
            path: path.to_path_buf(),
            source,
        };

        let modified = match policy {
            FingerprintPolicy::Content => None,
            FingerprintPolicy::ContentAndMtime => Some(fs.modified(path).map_err(transient)?),
        };
        let digest = compute_file_hash(fs, path).map_err(transient)?;

        Ok(Fingerprint::Present { digest, modified })
    }

    pub fn is_present(&self) -> bool {
        matches!(self, Fingerprint::Present { .. })
    }

    pub fn digest(&self) -> Option<&blake3::Hash> {
        match self {
            Fingerprint::Present { digest, .. } => Some(digest),
            Fingerprint::Absent => None,
        }
    }
}

/// Stream a file through BLAKE3 in fixed-size blocks.
pub fn compute_file_hash(fs: &dyn FileSystem, path: &Path) -> std::io::Result<blake3::Hash> {
    let mut hasher = Hasher::new();
    let mut file = fs.open_read(path)?;
    let mut buf = [0u8; READ_BLOCK];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    let hash = hasher.finalize();
    debug!(path = ?path, hash = %hash.to_hex(), "hashed file");
    Ok(hash)
}
