// src/exec/mod.rs

//! Process execution layer.
//!
//! - [`backend`] provides the `CommandRunner` trait and the production
//!   `ShellRunner` built on `tokio::process::Command`.
//! - [`pass`] runs one pass: every configured command in order, halting at
//!   the first failure.

pub mod backend;
pub mod pass;

pub use backend::{CommandRunner, ShellRunner};
pub use pass::run_pass;
