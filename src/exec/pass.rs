// src/exec/pass.rs

use tracing::debug;

use crate::engine::{EventSink, LoopEvent, PassOutcome};
use crate::errors::KeepTestingError;
use crate::exec::backend::CommandRunner;

/// Run `commands` strictly in order, stopping at the first failure.
///
/// Commands after a failing one are never started.
pub async fn run_pass<R>(runner: &mut R, commands: &[String], events: &EventSink) -> PassOutcome
where
    R: CommandRunner + ?Sized,
{
    for (index, command) in commands.iter().enumerate() {
        events.emit(LoopEvent::CommandStarted {
            index,
            command: command.clone(),
        });

        match runner.run(command).await {
            Ok(()) => {
                events.emit(LoopEvent::CommandSucceeded {
                    command: command.clone(),
                });
            }
            Err(err) => {
                let code = match &err {
                    KeepTestingError::CommandFailure { code, .. } => *code,
                    _ => None,
                };
                debug!(cmd = %command, error = %err, "command returned an error");
                events.emit(LoopEvent::CommandFailed {
                    command: command.clone(),
                    code,
                });

                let skipped = commands.len() - index - 1;
                if skipped > 0 {
                    debug!(skipped, "skipping remaining commands of this pass");
                }
                return PassOutcome::Failed {
                    command: command.clone(),
                    code,
                };
            }
        }
    }

    PassOutcome::Success
}
