// src/config/model.rs

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::engine::LoopOptions;
use crate::types::FingerprintPolicy;
use crate::watch::IgnoreSet;

pub const DEFAULT_SLEEP_SECS: f64 = 0.2;
pub const DEFAULT_RESCAN_SECS: f64 = 5.0;

/// Optional configuration file.
///
/// ```toml
/// cmds = ["cargo build", "cargo test"]
/// dirs = ["src", "tests"]
/// files = ["Cargo.toml"]
/// ignores = [".*/target/.*", ".*\\.log"]
/// sleep = 0.2
/// rescan = 5.0
/// strict = false
/// ```
///
/// Every key is optional; unknown keys are rejected.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    #[serde(default)]
    pub cmds: Vec<String>,

    #[serde(default)]
    pub dirs: Vec<PathBuf>,

    #[serde(default)]
    pub files: Vec<PathBuf>,

    #[serde(default)]
    pub ignores: Vec<String>,

    /// Seconds between two notification polls.
    pub sleep: Option<f64>,

    /// Seconds between two full rescans while waiting.
    pub rescan: Option<f64>,

    /// Include modification times in fingerprints.
    pub strict: Option<bool>,
}

/// CLI and config file merged, not yet checked against the filesystem.
#[derive(Debug, Clone, PartialEq)]
pub struct RawSettings {
    pub cmds: Vec<String>,
    pub dirs: Vec<PathBuf>,
    pub files: Vec<PathBuf>,
    pub ignores: Vec<String>,
    pub sleep: f64,
    pub rescan: f64,
    pub strict: bool,
    pub once: bool,
}

impl Default for RawSettings {
    fn default() -> Self {
        Self {
            cmds: Vec::new(),
            dirs: Vec::new(),
            files: Vec::new(),
            ignores: Vec::new(),
            sleep: DEFAULT_SLEEP_SECS,
            rescan: DEFAULT_RESCAN_SECS,
            strict: false,
            once: false,
        }
    }
}

/// Validated settings the rest of the program runs on.
///
/// Paths are absolute, canonical and unique; `files` are regular files and
/// `dirs` are directories at the time of validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub cmds: Vec<String>,
    pub files: Vec<PathBuf>,
    pub dirs: Vec<PathBuf>,
    pub ignore: IgnoreSet,
    pub poll_interval: Duration,
    pub rescan_interval: Duration,
    pub run_once: bool,
    pub policy: FingerprintPolicy,
}

impl Settings {
    pub fn loop_options(&self) -> LoopOptions {
        LoopOptions {
            run_once: self.run_once,
            poll_interval: self.poll_interval,
            rescan_interval: self.rescan_interval,
        }
    }
}
