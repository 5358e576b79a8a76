#![allow(dead_code)]

use std::path::{Path, PathBuf};

use keep_testing::config::validate::validate_with_fs;
use keep_testing::config::{RawSettings, Settings};
use keep_testing::fs::FileSystem;

/// Builder for `Settings` to simplify test setup.
///
/// Starts from the same defaults the CLI uses (0.2s sleep, 5s rescan,
/// content-only fingerprints, continuous mode).
pub struct SettingsBuilder {
    raw: RawSettings,
}

impl SettingsBuilder {
    pub fn new() -> Self {
        Self {
            raw: RawSettings::default(),
        }
    }

    pub fn cmd(mut self, cmd: &str) -> Self {
        self.raw.cmds.push(cmd.to_string());
        self
    }

    pub fn dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.raw.dirs.push(dir.as_ref().to_path_buf());
        self
    }

    pub fn file(mut self, file: impl AsRef<Path>) -> Self {
        self.raw.files.push(file.as_ref().to_path_buf());
        self
    }

    pub fn ignore(mut self, pattern: &str) -> Self {
        self.raw.ignores.push(pattern.to_string());
        self
    }

    pub fn sleep(mut self, secs: f64) -> Self {
        self.raw.sleep = secs;
        self
    }

    pub fn rescan(mut self, secs: f64) -> Self {
        self.raw.rescan = secs;
        self
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.raw.strict = strict;
        self
    }

    pub fn once(mut self, once: bool) -> Self {
        self.raw.once = once;
        self
    }

    pub fn raw(self) -> RawSettings {
        self.raw
    }

    /// Validate against the real filesystem.
    pub fn build(self) -> Settings {
        Settings::try_from(self.raw).expect("Failed to build valid settings from builder")
    }

    pub fn build_with_fs(self, fs: &dyn FileSystem) -> Settings {
        validate_with_fs(self.raw, fs).expect("Failed to build valid settings from builder")
    }
}

impl Default for SettingsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Absolute, canonical path of a test fixture.
pub fn canonical(path: impl AsRef<Path>) -> PathBuf {
    std::fs::canonicalize(path.as_ref()).expect("fixture path should exist")
}
