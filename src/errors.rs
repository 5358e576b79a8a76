// src/errors.rs

//! Crate-wide error type and `Result` alias.
//!
//! Only configuration problems are fatal. Every other variant is recovered
//! locally by the engine and surfaced as a log line or a `LoopEvent`.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum KeepTestingError {
    /// A declared watch path, ignore pattern or setting is invalid.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A file vanished or became unreadable between enumeration and hashing.
    #[error("Could not read {path:?}: {source}")]
    TransientRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A command exited non-zero (or could not be spawned at all).
    #[error("Command failed: {command} (exit code {code:?})")]
    CommandFailure { command: String, code: Option<i32> },

    /// Kernel notification subscription could not be established.
    #[error("Watcher subscription error: {0}")]
    WatcherSubscription(#[from] notify::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl KeepTestingError {
    pub fn config(msg: impl Into<String>) -> Self {
        KeepTestingError::Configuration(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, KeepTestingError>;
