// src/watch/watcher.rs

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::{Duration, Instant};

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, info, trace, warn};

use crate::errors::Result;
use crate::watch::{IgnoreSet, WatchSet};

/// Cheap "something happened" signal over a set of directory trees.
///
/// Implementations may be lossy. A `true` from [`changed`] only means an
/// authoritative [`WatchSet::update`](crate::watch::WatchSet::update) is worth
/// running; `false` never proves that nothing changed.
///
/// [`changed`]: NotificationSource::changed
pub trait NotificationSource: Send {
    /// (Re-)subscribe to the given directories, recursively. Any previous
    /// subscription and its pending events are dropped.
    fn subscribe(&mut self, dirs: &[PathBuf]) -> Result<()>;

    /// Non-blocking, draining poll: returns true if anything arrived since
    /// the previous call.
    fn changed(&mut self) -> bool;
}

/// Minimal set of directories whose recursive subscriptions cover every
/// watched file and directory.
///
/// Takes the parent of every file plus every directory, sorts them and drops
/// each entry that lies below an entry already kept. Prefixes are compared
/// per path component, so `/a/bc` is not considered to be under `/a/b`.
pub fn covering_set(files: &[PathBuf], dirs: &[PathBuf]) -> Vec<PathBuf> {
    let candidates: BTreeSet<&Path> = files
        .iter()
        .filter_map(|f| f.parent())
        .chain(dirs.iter().map(PathBuf::as_path))
        .collect();

    let mut kept: Vec<PathBuf> = Vec::new();
    for candidate in candidates {
        // Component-wise ordering puts every descendant right after its
        // ancestor, so checking the last kept entry is enough.
        match kept.last() {
            Some(last) if candidate.starts_with(last) => {}
            _ => kept.push(candidate.to_path_buf()),
        }
    }
    kept
}

/// Tells whether a notified path can still show up in a [`WatchSet`] rescan.
///
/// A path is dropped only when it is provably ignored: it lies under at least
/// one watched directory, and below every such directory some component of it
/// matches the ignore rules. Explicit files are never dropped, and neither is
/// anything outside the watched directories.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    ignore: IgnoreSet,
    dirs: Vec<PathBuf>,
    files: BTreeSet<PathBuf>,
}

impl EventFilter {
    pub fn new(ignore: IgnoreSet, dirs: &[PathBuf], files: &[PathBuf]) -> Self {
        Self {
            ignore,
            dirs: dirs.to_vec(),
            files: files.iter().cloned().collect(),
        }
    }

    pub fn for_watch_set(watch_set: &WatchSet) -> Self {
        let dirs: Vec<PathBuf> = watch_set.dirs().map(PathBuf::from).collect();
        let files: Vec<PathBuf> = watch_set.files().map(PathBuf::from).collect();
        Self::new(watch_set.ignore().clone(), &dirs, &files)
    }

    pub fn is_ignored(&self, path: &Path) -> bool {
        if self.ignore.is_empty() || self.files.contains(path) {
            return false;
        }

        let mut inside = false;
        for root in &self.dirs {
            let Ok(rel) = path.strip_prefix(root) else {
                continue;
            };
            inside = true;
            if !self.ignored_below(root, rel) {
                return false;
            }
        }
        inside
    }

    /// Snapshots skip a whole subtree once its top matches, so every prefix
    /// under `root` counts.
    fn ignored_below(&self, root: &Path, rel: &Path) -> bool {
        let mut current = root.to_path_buf();
        rel.components().any(|c| {
            current.push(c);
            self.ignore.is_ignored(&current)
        })
    }

    /// True when the event carries paths and all of them are ignored.
    fn drops(&self, event: &Event) -> bool {
        !event.paths.is_empty() && event.paths.iter().all(|p| self.is_ignored(p))
    }
}

/// Kernel-backed source built on `notify`'s recommended watcher (inotify,
/// FSEvents, ReadDirectoryChangesW, kqueue).
#[derive(Default)]
pub struct NotifySource {
    watcher: Option<RecommendedWatcher>,
    rx: Option<mpsc::Receiver<()>>,
    filter: EventFilter,
}

impl std::fmt::Debug for NotifySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotifySource")
            .field("subscribed", &self.watcher.is_some())
            .field("filter", &self.filter)
            .finish()
    }
}

impl NotifySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop events whose paths are all ignored by `filter`.
    pub fn with_filter(filter: EventFilter) -> Self {
        Self {
            filter,
            ..Self::default()
        }
    }
}

impl NotificationSource for NotifySource {
    /// Directories that do not exist (any more) are skipped with a warning;
    /// the periodic rescan covers them until they come back. Only failures
    /// of the watcher itself, such as creation or watch limits, are errors.
    fn subscribe(&mut self, dirs: &[PathBuf]) -> Result<()> {
        // Drop the old watcher first so its queue cannot leak into the new one.
        self.watcher = None;
        self.rx = None;

        if dirs.is_empty() {
            return Ok(());
        }

        let (tx, rx) = mpsc::channel::<()>();
        let filter = self.filter.clone();

        // Called synchronously by notify on its own thread.
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| {
                let relevant = match &res {
                    Ok(event) if !event.need_rescan() && filter.drops(event) => {
                        trace!(paths = ?event.paths, "ignored file event");
                        false
                    }
                    Ok(event) => is_relevant(event),
                    Err(err) => {
                        // Overflow or backend trouble: force an authoritative scan.
                        warn!(error = %err, "file watch error");
                        true
                    }
                };
                if relevant {
                    let _ = tx.send(());
                }
            },
            Config::default(),
        )?;

        let mut watched = Vec::with_capacity(dirs.len());
        for dir in dirs {
            if !dir.exists() {
                warn!(dir = ?dir, "watched directory is missing; not subscribing to it");
                continue;
            }
            match watcher.watch(dir, RecursiveMode::Recursive) {
                Ok(()) => watched.push(dir),
                Err(err) if is_missing(&err) => {
                    warn!(dir = ?dir, error = %err, "watched directory vanished; not subscribing to it");
                }
                Err(err) => return Err(err.into()),
            }
        }

        info!(dirs = ?watched, "file notifications subscribed");
        self.watcher = Some(watcher);
        self.rx = Some(rx);
        Ok(())
    }

    fn changed(&mut self) -> bool {
        let Some(rx) = &self.rx else {
            return false;
        };

        let mut seen = 0usize;
        while rx.try_recv().is_ok() {
            seen += 1;
        }
        if seen > 0 {
            debug!(events = seen, "drained file notifications");
        }
        seen > 0
    }
}

fn is_missing(err: &notify::Error) -> bool {
    match &err.kind {
        notify::ErrorKind::PathNotFound => true,
        notify::ErrorKind::Io(io) => io.kind() == std::io::ErrorKind::NotFound,
        _ => false,
    }
}

/// Content, metadata, creation, deletion and rename events matter; plain
/// reads (including our own hashing) do not.
fn is_relevant(event: &Event) -> bool {
    if event.need_rescan() {
        return true;
    }
    matches!(
        event.kind,
        EventKind::Any | EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    )
}

/// Fallback used when kernel notifications are unavailable: reports a change
/// once per `period`, turning the loop into plain periodic rescanning.
#[derive(Debug)]
pub struct PollingSource {
    period: Duration,
    last: Instant,
}

impl PollingSource {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            last: Instant::now(),
        }
    }
}

impl NotificationSource for PollingSource {
    fn subscribe(&mut self, _dirs: &[PathBuf]) -> Result<()> {
        self.last = Instant::now();
        Ok(())
    }

    fn changed(&mut self) -> bool {
        if self.last.elapsed() >= self.period {
            self.last = Instant::now();
            true
        } else {
            false
        }
    }
}
