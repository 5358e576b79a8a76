// src/trigger.rs

//! Manual trigger (ENTER on stdin) and the background thread that watches for it.
//!
//! Blocking stdin reads would keep the monitor thread alive forever, so the
//! monitor waits with a bounded timeout and checks its stop flag in between.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, info, warn};

/// Flag raised by the monitor and consumed by the execution loop.
///
/// Clones share the same flag.
#[derive(Debug, Clone, Default)]
pub struct ManualTrigger(Arc<AtomicBool>);

impl ManualTrigger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fire(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Read and clear the flag.
    pub fn take(&self) -> bool {
        self.0.swap(false, Ordering::SeqCst)
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Result of one bounded wait on the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputStatus {
    /// A full line was consumed.
    Line,
    /// Nothing arrived before the timeout.
    Timeout,
    /// End of input; no more lines will ever arrive.
    Closed,
}

/// Line-oriented input the monitor listens to.
pub trait TriggerInput: Send + 'static {
    fn wait_line(&mut self, timeout: Duration) -> io::Result<InputStatus>;
}

/// Process stdin.
#[derive(Debug, Default)]
pub struct StdinInput {
    buf: String,
}

impl StdinInput {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(unix)]
impl TriggerInput for StdinInput {
    fn wait_line(&mut self, timeout: Duration) -> io::Result<InputStatus> {
        let mut fds = libc::pollfd {
            fd: libc::STDIN_FILENO,
            events: libc::POLLIN,
            revents: 0,
        };
        let millis = libc::c_int::try_from(timeout.as_millis()).unwrap_or(libc::c_int::MAX);

        // SAFETY: `fds` is a single valid pollfd living for the whole call.
        let ready = unsafe { libc::poll(&mut fds, 1, millis) };
        if ready < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                return Ok(InputStatus::Timeout);
            }
            return Err(err);
        }
        if ready == 0 {
            return Ok(InputStatus::Timeout);
        }

        self.buf.clear();
        match io::stdin().read_line(&mut self.buf)? {
            0 => Ok(InputStatus::Closed),
            _ => Ok(InputStatus::Line),
        }
    }
}

#[cfg(not(unix))]
impl TriggerInput for StdinInput {
    fn wait_line(&mut self, _timeout: Duration) -> io::Result<InputStatus> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "bounded stdin reads are not supported on this platform",
        ))
    }
}

const DEFAULT_INPUT_TIMEOUT: Duration = Duration::from_millis(500);

/// Background thread turning input lines into [`ManualTrigger::fire`].
///
/// Stopped explicitly with [`TriggerMonitor::stop`] or on drop; both join
/// the thread.
#[derive(Debug)]
pub struct TriggerMonitor {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl TriggerMonitor {
    /// Watch process stdin.
    pub fn spawn(trigger: ManualTrigger) -> io::Result<Self> {
        Self::spawn_with(StdinInput::new(), trigger, DEFAULT_INPUT_TIMEOUT)
    }

    pub fn spawn_with<I: TriggerInput>(
        mut input: I,
        trigger: ManualTrigger,
        timeout: Duration,
    ) -> io::Result<Self> {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);

        let handle = thread::Builder::new()
            .name("keep-testing-stdin".to_string())
            .spawn(move || {
                debug!("starting trigger monitor");
                while !stop_flag.load(Ordering::SeqCst) {
                    match input.wait_line(timeout) {
                        Ok(InputStatus::Line) => {
                            info!("<ENTER> detected");
                            trigger.fire();
                        }
                        Ok(InputStatus::Timeout) => {}
                        Ok(InputStatus::Closed) => {
                            debug!("trigger input closed");
                            break;
                        }
                        Err(err) => {
                            warn!(error = %err, "manual trigger disabled");
                            break;
                        }
                    }
                }
                debug!("leaving trigger monitor");
            })?;

        Ok(Self {
            stop,
            handle: Some(handle),
        })
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Ask the thread to leave and wait for it.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("trigger monitor thread panicked");
            }
        }
    }
}

impl Drop for TriggerMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}
