// src/exec/backend.rs

//! Pluggable command runner abstraction.
//!
//! The execution loop talks to a `CommandRunner` instead of spawning
//! processes itself. Production uses [`ShellRunner`]; tests plug in a runner
//! that records commands and returns scripted outcomes.

use std::future::Future;
use std::pin::Pin;
use std::process::Stdio;

use anyhow::Context;
use tokio::process::Command;
use tracing::debug;

use crate::errors::{KeepTestingError, Result};

/// Trait abstracting how a single command string is executed.
pub trait CommandRunner: Send {
    /// Run `command` to completion.
    ///
    /// `Ok(())` means the command succeeded. A non-zero exit is reported as
    /// [`KeepTestingError::CommandFailure`]; any other error means the
    /// command could not be run at all, which counts as a failure too.
    fn run<'a>(
        &'a mut self,
        command: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;
}

/// Runs each command through the platform shell (`sh -c` / `cmd /C`),
/// sharing this process's stdout and stderr.
///
/// stdin is not passed on: the console belongs to the ENTER monitor.
#[derive(Debug, Clone, Default)]
pub struct ShellRunner;

impl ShellRunner {
    pub fn new() -> Self {
        Self
    }
}

impl CommandRunner for ShellRunner {
    fn run<'a>(
        &'a mut self,
        command: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            // Build a shell command appropriate for the platform.
            let mut cmd = if cfg!(windows) {
                let mut c = Command::new("cmd");
                c.arg("/C").arg(command);
                c
            } else {
                let mut c = Command::new("sh");
                c.arg("-c").arg(command);
                c
            };

            cmd.stdin(Stdio::null())
                .stdout(Stdio::inherit())
                .stderr(Stdio::inherit())
                .kill_on_drop(true);

            let mut child = cmd
                .spawn()
                .with_context(|| format!("spawning process for command '{command}'"))?;

            let status = child
                .wait()
                .await
                .with_context(|| format!("waiting for process of command '{command}'"))?;

            let code = status.code();
            debug!(cmd = %command, exit_code = ?code, success = status.success(), "command exited");

            if status.success() {
                Ok(())
            } else {
                debug!(cmd = %command, "reporting command failure");
                Err(KeepTestingError::CommandFailure {
                    command: command.to_string(),
                    code,
                })
            }
        })
    }
}
