// src/config/mod.rs

//! Configuration loading and validation for keep-testing.
//!
//! Responsibilities:
//! - Define the TOML-backed data model and the resolved settings (`model.rs`).
//! - Load a config file and merge it with the CLI (`loader.rs`).
//! - Validate watch paths, commands, patterns and intervals (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_from_path, resolve_settings};
pub use model::{ConfigFile, RawSettings, Settings};
