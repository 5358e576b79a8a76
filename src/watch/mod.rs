// src/watch/mod.rs

//! File watching and change detection.
//!
//! This module is responsible for:
//! - Fingerprinting file content (`hash`).
//! - Recursive, ignore-filtered snapshots of directory trees and their diff
//!   (`snapshot`, `patterns`).
//! - The authoritative [`WatchSet`] combining explicit files and directories.
//! - The cheap kernel-notification fast path (`watcher`), with a polling
//!   fallback when notifications are unavailable.
//!
//! It does **not** run commands; it only answers "did anything change, and
//! what".

pub mod hash;
pub mod patterns;
pub mod snapshot;
pub mod watch_set;
pub mod watcher;

pub use hash::{Fingerprint, compute_file_hash};
pub use patterns::IgnoreSet;
pub use snapshot::TreeSnapshot;
pub use watch_set::WatchSet;
pub use watcher::{EventFilter, NotificationSource, NotifySource, PollingSource, covering_set};
