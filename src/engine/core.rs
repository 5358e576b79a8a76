// src/engine/core.rs

//! Pure execution-loop state machine.
//!
//! This module contains a synchronous, deterministic core that consumes
//! [`LoopInput`]s and produces:
//! - an updated state
//! - a list of commands describing what the IO shell should do next
//!
//! The async shell (`engine::runtime::ExecutionLoop`) is responsible for
//! running passes, rescanning the watch set, polling notifications, sleeping
//! and observing shutdown. The core never touches the filesystem, processes
//! or Tokio.

use tracing::debug;

use crate::engine::{LoopInput, PassOutcome, PassReason};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Running,
    WaitingForChange,
    Finished,
}

/// Command produced by the core, to be executed by the outer IO shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopCommand {
    /// Run every configured command in order.
    RunPass(PassReason),
    /// Run the authoritative `WatchSet::update()`.
    CheckForChanges,
    /// Re-establish change notifications over the covering set.
    Subscribe,
    /// Sleep one poll interval, then report what was observed.
    Sleep,
    /// Stop the loop with this process exit status.
    Exit(i32),
}

/// Decision returned by the core after handling a single input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreStep {
    pub commands: Vec<LoopCommand>,
    /// Whether the outer loop should keep running.
    pub keep_running: bool,
}

impl CoreStep {
    fn next(commands: Vec<LoopCommand>) -> Self {
        Self {
            commands,
            keep_running: true,
        }
    }

    fn exit(status: i32) -> Self {
        Self {
            commands: vec![LoopCommand::Exit(status)],
            keep_running: false,
        }
    }
}

/// Pure core state.
#[derive(Debug)]
pub struct LoopCore {
    state: LoopState,
    run_once: bool,
    last_outcome: Option<PassOutcome>,
}

impl LoopCore {
    pub fn new(run_once: bool) -> Self {
        Self {
            state: LoopState::Idle,
            run_once,
            last_outcome: None,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn last_outcome(&self) -> Option<&PassOutcome> {
        self.last_outcome.as_ref()
    }

    /// Handle a single input, updating state and returning the resulting
    /// commands for the IO shell.
    pub fn step(&mut self, input: LoopInput) -> CoreStep {
        use LoopCommand::*;
        use LoopState::*;

        match (self.state, input) {
            (_, LoopInput::ShutdownRequested) => {
                self.state = Finished;
                CoreStep::exit(0)
            }
            (Finished, _) => CoreStep {
                commands: Vec::new(),
                keep_running: false,
            },
            (Idle, LoopInput::Start) => {
                self.state = Running;
                CoreStep::next(vec![RunPass(PassReason::Startup)])
            }
            (Running, LoopInput::PassFinished(outcome)) => {
                let status = outcome.exit_status();
                self.last_outcome = Some(outcome);
                if self.run_once {
                    self.state = Finished;
                    return CoreStep::exit(status);
                }
                // Commands may have touched watched files or created new
                // directories. Subscribe first so nothing that happens during
                // the check goes unseen, then look before waiting.
                self.state = WaitingForChange;
                CoreStep::next(vec![Subscribe, CheckForChanges])
            }
            (WaitingForChange, LoopInput::ChangesChecked(changes)) if !changes.is_empty() => {
                self.state = Running;
                CoreStep::next(vec![RunPass(PassReason::FilesChanged)])
            }
            (WaitingForChange, LoopInput::ChangesChecked(_)) => CoreStep::next(vec![Sleep]),
            (WaitingForChange, LoopInput::Notified) => {
                CoreStep::next(vec![Subscribe, CheckForChanges])
            }
            (WaitingForChange, LoopInput::RescanDue) => CoreStep::next(vec![CheckForChanges]),
            (WaitingForChange, LoopInput::ManualTrigger) => {
                self.state = Running;
                CoreStep::next(vec![RunPass(PassReason::ManualTrigger)])
            }
            (WaitingForChange, LoopInput::Tick) => CoreStep::next(vec![Sleep]),
            (state, input) => {
                debug!(?state, ?input, "input not applicable in current state; ignoring");
                CoreStep::next(Vec::new())
            }
        }
    }
}
