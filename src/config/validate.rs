// src/config/validate.rs

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::model::{RawSettings, Settings};
use crate::errors::{KeepTestingError, Result};
use crate::fs::{FileSystem, RealFileSystem};
use crate::types::FingerprintPolicy;
use crate::watch::IgnoreSet;

impl TryFrom<RawSettings> for Settings {
    type Error = KeepTestingError;

    fn try_from(raw: RawSettings) -> std::result::Result<Self, Self::Error> {
        validate_with_fs(raw, &RealFileSystem)
    }
}

/// Validate merged settings against `fs`.
pub fn validate_with_fs(raw: RawSettings, fs: &dyn FileSystem) -> Result<Settings> {
    ensure_has_commands(&raw.cmds)?;

    let files = normalize_paths(fs, &raw.files, PathKind::File)?;
    let dirs = normalize_paths(fs, &raw.dirs, PathKind::Dir)?;
    let ignore = IgnoreSet::new(&raw.ignores)?;

    let poll_interval = positive_secs("sleep", raw.sleep)?;
    let rescan_interval = positive_secs("rescan", raw.rescan)?;

    Ok(Settings {
        cmds: raw.cmds,
        files,
        dirs,
        ignore,
        poll_interval,
        rescan_interval,
        run_once: raw.once,
        policy: FingerprintPolicy::from_strict(raw.strict),
    })
}

fn ensure_has_commands(cmds: &[String]) -> Result<()> {
    if cmds.is_empty() {
        return Err(KeepTestingError::config(
            "at least one command is required (--cmds or `cmds` in the config file)",
        ));
    }
    if let Some(blank) = cmds.iter().position(|c| c.trim().is_empty()) {
        return Err(KeepTestingError::config(format!(
            "command #{} is empty",
            blank + 1
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, Copy)]
enum PathKind {
    File,
    Dir,
}

/// Check kind, canonicalize, drop duplicates while keeping first-seen order.
fn normalize_paths(fs: &dyn FileSystem, paths: &[PathBuf], kind: PathKind) -> Result<Vec<PathBuf>> {
    let mut seen = BTreeSet::new();
    let mut out = Vec::with_capacity(paths.len());

    for path in paths {
        check_kind(fs, path, kind)?;
        let canonical = fs.canonicalize(path).map_err(|err| {
            KeepTestingError::config(format!("cannot resolve {}: {err}", path.display()))
        })?;
        if seen.insert(canonical.clone()) {
            out.push(canonical);
        }
    }

    Ok(out)
}

fn check_kind(fs: &dyn FileSystem, path: &Path, kind: PathKind) -> Result<()> {
    let ok = match kind {
        PathKind::File => fs.is_file(path),
        PathKind::Dir => fs.is_dir(path),
    };
    if ok {
        return Ok(());
    }

    let expected = match kind {
        PathKind::File => "a regular file",
        PathKind::Dir => "a directory",
    };
    let msg = if fs.exists(path) {
        format!("{} is not {expected}", path.display())
    } else {
        format!("{} does not exist", path.display())
    };
    Err(KeepTestingError::config(msg))
}

fn positive_secs(name: &str, secs: f64) -> Result<Duration> {
    if !secs.is_finite() || secs <= 0.0 {
        return Err(KeepTestingError::config(format!(
            "{name} must be a positive number of seconds (got {secs})"
        )));
    }
    Duration::try_from_secs_f64(secs).map_err(|err| {
        KeepTestingError::config(format!("{name} is out of range ({secs}): {err}"))
    })
}
