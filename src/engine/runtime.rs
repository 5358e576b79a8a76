// src/engine/runtime.rs

use std::collections::VecDeque;
use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::errors::{KeepTestingError, Result};
use crate::exec::{CommandRunner, run_pass};
use crate::trigger::ManualTrigger;
use crate::types::ChangeDescriptor;
use crate::watch::{
    EventFilter, NotificationSource, NotifySource, PollingSource, WatchSet, covering_set,
};

use super::core::LoopCore;
use super::{EventSink, LoopCommand, LoopEvent, LoopInput, LoopOptions};

/// Drives [`LoopCore`] and performs the IO it asks for: passes through a
/// [`CommandRunner`], authoritative rescans of the [`WatchSet`], polls of a
/// [`NotificationSource`], sleeps, and shutdown.
pub struct ExecutionLoop<R: CommandRunner> {
    core: LoopCore,
    options: LoopOptions,
    commands: Vec<String>,
    watch_set: Arc<Mutex<WatchSet>>,
    covering: Vec<PathBuf>,
    notifications: Box<dyn NotificationSource>,
    /// Stands in for `notifications` while its last subscription failed.
    fallback: Option<PollingSource>,
    subscription: Subscription,
    /// A subscription was made since the last pass; announce the wait on
    /// the next sleep.
    announce_wait: bool,
    trigger: ManualTrigger,
    runner: R,
    events: EventSink,
    shutdown: Option<watch::Receiver<bool>>,
    last_check: Instant,
}

impl<R: CommandRunner> fmt::Debug for ExecutionLoop<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionLoop")
            .field("core", &self.core)
            .field("options", &self.options)
            .field("commands", &self.commands)
            .finish_non_exhaustive()
    }
}

impl<R: CommandRunner> ExecutionLoop<R> {
    /// Loop over `commands`, watching everything in `watch_set`.
    ///
    /// Defaults: kernel notifications via [`NotifySource`] (skipping events
    /// the ignore rules would drop anyway), a private manual
    /// trigger, no event consumer and no shutdown signal.
    pub fn new(
        options: LoopOptions,
        commands: Vec<String>,
        watch_set: WatchSet,
        runner: R,
    ) -> Self {
        let files: Vec<PathBuf> = watch_set.files().map(PathBuf::from).collect();
        let dirs: Vec<PathBuf> = watch_set.dirs().map(PathBuf::from).collect();
        let filter = EventFilter::for_watch_set(&watch_set);

        Self {
            core: LoopCore::new(options.run_once),
            options,
            commands,
            watch_set: Arc::new(Mutex::new(watch_set)),
            covering: covering_set(&files, &dirs),
            notifications: Box::new(NotifySource::with_filter(filter)),
            fallback: None,
            subscription: Subscription::Pending,
            announce_wait: false,
            trigger: ManualTrigger::new(),
            runner,
            events: EventSink::discard(),
            shutdown: None,
            last_check: Instant::now(),
        }
    }

    pub fn with_notifications(mut self, source: Box<dyn NotificationSource>) -> Self {
        self.notifications = source;
        self
    }

    pub fn with_trigger(mut self, trigger: ManualTrigger) -> Self {
        self.trigger = trigger;
        self
    }

    pub fn with_events(mut self, events: EventSink) -> Self {
        self.events = events;
        self
    }

    /// Stop (with status 0) once `true` is published on `shutdown`.
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// Directories the notification source subscribes to.
    pub fn covering(&self) -> &[PathBuf] {
        &self.covering
    }

    /// Main loop. Returns the process exit status.
    pub async fn run(mut self) -> Result<i32> {
        info!(commands = self.commands.len(), run_once = self.options.run_once, "execution loop started");

        let mut inputs = VecDeque::from([LoopInput::Start]);

        while let Some(input) = inputs.pop_front() {
            debug!(?input, "loop input");
            let step = self.core.step(input);

            for command in step.commands {
                if let LoopCommand::Exit(status) = command {
                    info!(status, "execution loop finished");
                    return Ok(status);
                }
                if let Some(next) = self.execute(command).await? {
                    inputs.push_back(next);
                }
            }

            if !step.keep_running {
                break;
            }
            if inputs.is_empty() {
                inputs.push_back(self.sleep().await);
            }
        }

        Ok(self.core.last_outcome().map_or(0, |o| o.exit_status()))
    }

    async fn execute(&mut self, command: LoopCommand) -> Result<Option<LoopInput>> {
        let next = match command {
            LoopCommand::RunPass(reason) => {
                self.announce_wait = false;
                self.events.emit(LoopEvent::PassStarted { reason });
                let outcome = tokio::select! {
                    outcome = run_pass(&mut self.runner, &self.commands, &self.events) => outcome,
                    _ = shutdown_requested(&mut self.shutdown) => {
                        self.events.emit(LoopEvent::ShutdownRequested);
                        return Ok(Some(LoopInput::ShutdownRequested));
                    }
                };
                // ENTER pressed while the pass was running does not queue another one.
                if self.trigger.take() {
                    debug!("discarding manual trigger raised during the pass");
                }
                self.events.emit(LoopEvent::PassFinished {
                    outcome: outcome.clone(),
                });
                Some(LoopInput::PassFinished(outcome))
            }
            LoopCommand::CheckForChanges => {
                let changes = self.check_for_changes().await?;
                if !changes.is_empty() {
                    self.events.emit(LoopEvent::ChangesDetected {
                        changes: changes.clone(),
                    });
                }
                Some(LoopInput::ChangesChecked(changes))
            }
            LoopCommand::Subscribe => {
                self.subscribe();
                self.announce_wait = true;
                None
            }
            LoopCommand::Sleep => Some(self.sleep().await),
            // Consumed by `run` before it gets here.
            LoopCommand::Exit(_) => None,
        };
        Ok(next)
    }

    /// Run the authoritative rescan off the async threads.
    async fn check_for_changes(&mut self) -> Result<Vec<ChangeDescriptor>> {
        let watch_set = Arc::clone(&self.watch_set);
        let started = Instant::now();

        let changes = tokio::task::spawn_blocking(move || {
            let mut guard = match watch_set.lock() {
                Ok(guard) => guard,
                Err(poisoned) => {
                    warn!("watch set mutex poisoned; continuing with last state");
                    poisoned.into_inner()
                }
            };
            guard.update()
        })
        .await
        .map_err(|err| KeepTestingError::Other(err.into()))?;

        self.last_check = Instant::now();
        debug!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            changes = changes.len(),
            "time to check"
        );
        Ok(changes)
    }

    /// (Re-)subscribe the primary source. While it keeps failing, a
    /// [`PollingSource`] stands in; every later `Subscribe` tries the primary
    /// again.
    fn subscribe(&mut self) {
        match self.notifications.subscribe(&self.covering) {
            Ok(()) => {
                if self.fallback.take().is_some() {
                    info!("file notifications restored");
                }
                if self.subscription != Subscription::Established {
                    self.subscription = Subscription::Established;
                    self.events.emit(LoopEvent::NotificationsEstablished {
                        dirs: self.covering.clone(),
                    });
                }
            }
            Err(err) => {
                if self.subscription == Subscription::Degraded {
                    debug!(error = %err, "file notifications still unavailable");
                } else {
                    warn!(error = %err, "file notifications unavailable; falling back to periodic rescans");
                    self.subscription = Subscription::Degraded;
                    self.events.emit(LoopEvent::NotificationsDegraded {
                        reason: err.to_string(),
                    });
                }
                let period = self.options.rescan_interval;
                let fallback = self.fallback.get_or_insert_with(|| PollingSource::new(period));
                // Polling subscriptions cannot fail.
                let _ = fallback.subscribe(&self.covering);
            }
        }
    }

    /// Sleep one poll interval, then report the most urgent observation.
    async fn sleep(&mut self) -> LoopInput {
        if std::mem::take(&mut self.announce_wait) {
            self.events.emit(LoopEvent::Waiting);
        }

        tokio::select! {
            _ = tokio::time::sleep(self.options.poll_interval) => {}
            _ = shutdown_requested(&mut self.shutdown) => {
                self.events.emit(LoopEvent::ShutdownRequested);
                return LoopInput::ShutdownRequested;
            }
        }

        if self.trigger.take() {
            self.events.emit(LoopEvent::ManualTriggered);
            return LoopInput::ManualTrigger;
        }
        let notified = match self.fallback.as_mut() {
            Some(fallback) => fallback.changed(),
            None => self.notifications.changed(),
        };
        if notified {
            return LoopInput::Notified;
        }
        if self.last_check.elapsed() >= self.options.rescan_interval {
            return LoopInput::RescanDue;
        }
        LoopInput::Tick
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Subscription {
    Pending,
    Established,
    Degraded,
}

/// Resolves once `true` has been published on the shutdown channel. Never
/// resolves without a channel, or after its sender is gone.
async fn shutdown_requested(shutdown: &mut Option<watch::Receiver<bool>>) {
    let Some(rx) = shutdown else {
        return std::future::pending().await;
    };
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            return std::future::pending().await;
        }
    }
}
