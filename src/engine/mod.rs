// src/engine/mod.rs

//! Orchestration engine for keep-testing.
//!
//! This module ties together:
//! - command passes (run every command in order, stop at first failure)
//! - the wait cycle between passes, which reacts to:
//!   - kernel change notifications (confirmed by an authoritative rescan)
//!   - periodic authoritative rescans
//!   - the manual ENTER trigger
//!   - shutdown requests
//!
//! The pure state machine lives in [`core`]; the async/IO shell is
//! implemented in [`runtime`].

use std::path::PathBuf;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::types::ChangeDescriptor;

/// Why a pass was started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassReason {
    /// First pass after startup.
    Startup,
    /// An authoritative rescan reported a non-empty diff.
    FilesChanged,
    /// The user asked for a pass (ENTER), regardless of changes.
    ManualTrigger,
}

/// Result of one pass over the configured commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassOutcome {
    Success,
    /// `command` failed and every command after it was skipped.
    Failed { command: String, code: Option<i32> },
}

impl PassOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, PassOutcome::Success)
    }

    /// Process exit status for run-once mode.
    pub fn exit_status(&self) -> i32 {
        if self.is_success() { 0 } else { 1 }
    }
}

/// Runtime options used by both the core and the async shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopOptions {
    /// Run a single pass and exit with its status.
    pub run_once: bool,
    /// Sleep between two cheap notification polls.
    pub poll_interval: Duration,
    /// Maximum time between two authoritative rescans while waiting.
    pub rescan_interval: Duration,
}

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(200);
pub const DEFAULT_RESCAN_INTERVAL: Duration = Duration::from_secs(5);

impl Default for LoopOptions {
    fn default() -> Self {
        Self {
            run_once: false,
            poll_interval: DEFAULT_POLL_INTERVAL,
            rescan_interval: DEFAULT_RESCAN_INTERVAL,
        }
    }
}

/// Semantic events produced by the loop, left unformatted so the caller can
/// log or route them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopEvent {
    PassStarted { reason: PassReason },
    CommandStarted { index: usize, command: String },
    CommandSucceeded { command: String },
    CommandFailed { command: String, code: Option<i32> },
    PassFinished { outcome: PassOutcome },
    ChangesDetected { changes: Vec<ChangeDescriptor> },
    ManualTriggered,
    NotificationsEstablished { dirs: Vec<PathBuf> },
    NotificationsDegraded { reason: String },
    /// Entered a wait cycle: watching for changes and ENTER presses.
    Waiting,
    ShutdownRequested,
}

/// Inputs fed into the pure core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopInput {
    Start,
    PassFinished(PassOutcome),
    ChangesChecked(Vec<ChangeDescriptor>),
    Notified,
    RescanDue,
    ManualTrigger,
    /// A sleep interval elapsed with nothing to report.
    Tick,
    ShutdownRequested,
}

/// Sending half of the event stream. Events sent after the receiver is gone
/// are dropped silently.
#[derive(Debug, Clone, Default)]
pub struct EventSink {
    tx: Option<mpsc::UnboundedSender<LoopEvent>>,
}

impl EventSink {
    pub fn new(tx: mpsc::UnboundedSender<LoopEvent>) -> Self {
        Self { tx: Some(tx) }
    }

    /// A sink that throws every event away.
    pub fn discard() -> Self {
        Self { tx: None }
    }

    pub fn emit(&self, event: LoopEvent) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(event);
        }
    }
}

/// Convenience: a connected sink / receiver pair.
pub fn event_channel() -> (EventSink, mpsc::UnboundedReceiver<LoopEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (EventSink::new(tx), rx)
}

pub mod core;
pub mod runtime;

pub use self::core::{CoreStep, LoopCommand, LoopCore, LoopState};
pub use runtime::ExecutionLoop;
