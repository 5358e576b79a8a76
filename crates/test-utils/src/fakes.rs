use std::collections::BTreeSet;
use std::future::Future;
use std::io;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::mpsc as std_mpsc;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use keep_testing::errors::{KeepTestingError, Result};
use keep_testing::exec::CommandRunner;
use keep_testing::trigger::{InputStatus, TriggerInput};
use keep_testing::watch::NotificationSource;

/// A fake command runner that:
/// - records which commands were "run", in order
/// - fails the commands registered with [`FakeRunner::failing`] (exit code 1)
/// - optionally takes some time per command
#[derive(Debug, Clone, Default)]
pub struct FakeRunner {
    executed: Arc<Mutex<Vec<String>>>,
    failing: BTreeSet<String>,
    delay: Option<Duration>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(mut self, command: &str) -> Self {
        self.failing.insert(command.to_string());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Shared log of executed commands; stays valid after the runner moved
    /// into a loop.
    pub fn executed(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.executed)
    }
}

impl CommandRunner for FakeRunner {
    fn run<'a>(
        &'a mut self,
        command: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            self.executed.lock().unwrap().push(command.to_string());

            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }

            if self.failing.contains(command) {
                return Err(KeepTestingError::CommandFailure {
                    command: command.to_string(),
                    code: Some(1),
                });
            }
            Ok(())
        })
    }
}

#[derive(Debug, Default)]
struct NotificationState {
    pending: usize,
    subscriptions: Vec<Vec<PathBuf>>,
    fail_subscribe: bool,
}

/// Scripted [`NotificationSource`]. Clones share state, so a test can keep
/// one handle and move another into the loop.
#[derive(Debug, Clone, Default)]
pub struct FakeNotifications {
    state: Arc<Mutex<NotificationState>>,
}

impl FakeNotifications {
    pub fn new() -> Self {
        Self::default()
    }

    /// A source whose every `subscribe` fails, like a kernel watcher that
    /// cannot be created.
    pub fn broken() -> Self {
        let fake = Self::default();
        fake.state.lock().unwrap().fail_subscribe = true;
        fake
    }

    /// Make later `subscribe` calls fail (`true`) or succeed again (`false`).
    pub fn set_broken(&self, broken: bool) {
        self.state.lock().unwrap().fail_subscribe = broken;
    }

    /// Queue one notification for the next `changed()` call.
    pub fn notify(&self) {
        self.state.lock().unwrap().pending += 1;
    }

    /// Every covering set passed to `subscribe`, oldest first.
    pub fn subscriptions(&self) -> Vec<Vec<PathBuf>> {
        self.state.lock().unwrap().subscriptions.clone()
    }
}

impl NotificationSource for FakeNotifications {
    fn subscribe(&mut self, dirs: &[PathBuf]) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_subscribe {
            return Err(KeepTestingError::WatcherSubscription(notify_error()));
        }
        state.subscriptions.push(dirs.to_vec());
        Ok(())
    }

    fn changed(&mut self) -> bool {
        let mut state = self.state.lock().unwrap();
        std::mem::take(&mut state.pending) > 0
    }
}

fn notify_error() -> notify::Error {
    notify::Error::generic("fake watcher refused the subscription")
}

/// [`TriggerInput`] fed from a channel: each `()` sent is one line, dropping
/// the sender is end of input.
#[derive(Debug)]
pub struct ChannelInput {
    rx: std_mpsc::Receiver<()>,
}

impl ChannelInput {
    pub fn new() -> (std_mpsc::Sender<()>, Self) {
        let (tx, rx) = std_mpsc::channel();
        (tx, Self { rx })
    }
}

impl TriggerInput for ChannelInput {
    fn wait_line(&mut self, timeout: Duration) -> io::Result<InputStatus> {
        match self.rx.recv_timeout(timeout) {
            Ok(()) => Ok(InputStatus::Line),
            Err(std_mpsc::RecvTimeoutError::Timeout) => Ok(InputStatus::Timeout),
            Err(std_mpsc::RecvTimeoutError::Disconnected) => Ok(InputStatus::Closed),
        }
    }
}
