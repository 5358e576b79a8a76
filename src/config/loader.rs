// src/config/loader.rs

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::cli::CliArgs;
use crate::config::model::{ConfigFile, RawSettings, Settings};
use crate::errors::{KeepTestingError, Result};

/// Load a configuration file from a given path.
///
/// This only performs TOML deserialization; paths are checked later when the
/// merged [`RawSettings`] are turned into [`Settings`].
pub fn load_from_path(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|err| {
        KeepTestingError::config(format!("cannot read config file {}: {err}", path.display()))
    })?;

    let config: ConfigFile = toml::from_str(&contents)?;
    debug!(path = %path.display(), "loaded config file");

    Ok(config)
}

/// Merge CLI arguments with an optional config file.
///
/// CLI list values come first and the file's lists are appended. Scalars
/// given on the command line win over the file's.
pub fn merge(cli: &CliArgs, file: Option<ConfigFile>) -> RawSettings {
    let file = file.unwrap_or_default();
    let defaults = RawSettings::default();

    RawSettings {
        cmds: cli.cmds.iter().cloned().chain(file.cmds).collect(),
        dirs: cli.dirs.iter().cloned().chain(file.dirs).collect(),
        files: cli.files.iter().cloned().chain(file.files).collect(),
        ignores: cli.ignores.iter().cloned().chain(file.ignores).collect(),
        sleep: cli.sleep.or(file.sleep).unwrap_or(defaults.sleep),
        rescan: cli.rescan.or(file.rescan).unwrap_or(defaults.rescan),
        strict: cli.strict || file.strict.unwrap_or(false),
        once: cli.once,
    }
}

/// Resolve the settings for a run: load `--config` if given, merge, validate.
pub fn resolve_settings(cli: &CliArgs) -> Result<Settings> {
    let file = cli.config.as_deref().map(|p| load_from_path(p)).transpose()?;
    let raw = merge(cli, file);
    Settings::try_from(raw)
}
