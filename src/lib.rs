// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod report;
pub mod trigger;
pub mod types;
pub mod watch;

use anyhow::{Context, Result};
use tokio::sync::watch as signal_watch;
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::{Settings, resolve_settings};
use crate::engine::{ExecutionLoop, event_channel};
use crate::exec::ShellRunner;
use crate::trigger::{ManualTrigger, TriggerMonitor};
use crate::watch::WatchSet;

/// High-level entry point used by `main.rs`. Returns the process exit status.
///
/// This wires together:
/// - config resolution and validation
/// - the watch set (skipped in `--once` mode)
/// - the <ENTER> monitor thread
/// - the execution loop and its event reporter
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<i32> {
    let settings = resolve_settings(&args)?;

    if args.dry_run {
        print_dry_run(&settings);
        return Ok(0);
    }

    info!("Executing {:?}", settings.cmds);
    if !settings.dirs.is_empty() {
        info!("Watching dirs {:?}", settings.dirs);
    }
    if !settings.files.is_empty() {
        info!("Watching files {:?}", settings.files);
    }
    if !settings.ignore.is_empty() {
        info!("Ignoring {:?}", settings.ignore.patterns());
    }

    let watch_set = if settings.run_once {
        WatchSet::new(&[], &[], Default::default(), settings.policy)
    } else {
        build_watch_set(&settings).await?
    };

    // Ctrl-C → graceful shutdown.
    let (shutdown_tx, shutdown_rx) = signal_watch::channel(false);
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            eprintln!("failed to listen for Ctrl+C: {e}");
            return;
        }
        info!("Ctrl+C pressed");
        let _ = shutdown_tx.send(true);
    });

    let trigger = ManualTrigger::new();
    let mut monitor = if settings.run_once {
        None
    } else {
        Some(TriggerMonitor::spawn(trigger.clone()).context("failed to start <ENTER> monitoring")?)
    };

    let (events, events_rx) = event_channel();
    let reporter = tokio::spawn(report::report_events(events_rx));

    let exec_loop = ExecutionLoop::new(
        settings.loop_options(),
        settings.cmds.clone(),
        watch_set,
        ShellRunner::new(),
    )
    .with_trigger(trigger)
    .with_events(events)
    .with_shutdown(shutdown_rx);

    let status = exec_loop.run().await;

    if let Some(monitor) = monitor.as_mut() {
        info!("Stopping <ENTER> monitoring");
        monitor.stop();
    }

    // The loop owned the only sender; the reporter drains and exits.
    if let Err(err) = reporter.await {
        debug!(error = %err, "event reporter ended abnormally");
    }

    let status = status?;
    info!("Bye");
    Ok(status)
}

/// Initial scan of every watched path, off the async threads.
async fn build_watch_set(settings: &Settings) -> Result<WatchSet> {
    let files = settings.files.clone();
    let dirs = settings.dirs.clone();
    let ignore = settings.ignore.clone();
    let policy = settings.policy;

    debug!("Starting watching");
    let watch_set = tokio::task::spawn_blocking(move || WatchSet::new(&files, &dirs, ignore, policy))
        .await
        .context("initial scan of watched paths panicked")?;
    debug!("Information gathered");

    Ok(watch_set)
}

/// Simple dry-run output: print the resolved settings.
fn print_dry_run(settings: &Settings) {
    println!("keep-testing dry-run");
    println!("  sleep = {:?}", settings.poll_interval);
    println!("  rescan = {:?}", settings.rescan_interval);
    println!("  once = {}", settings.run_once);
    println!("  policy = {:?}", settings.policy);
    println!();

    println!("cmds ({}):", settings.cmds.len());
    for cmd in &settings.cmds {
        println!("  - {cmd}");
    }
    if !settings.dirs.is_empty() {
        println!("dirs:");
        for dir in &settings.dirs {
            println!("  - {}", dir.display());
        }
    }
    if !settings.files.is_empty() {
        println!("files:");
        for file in &settings.files {
            println!("  - {}", file.display());
        }
    }
    if !settings.ignore.is_empty() {
        println!("ignores:");
        for pat in settings.ignore.patterns() {
            println!("  - {pat}");
        }
    }

    debug!("dry-run complete (no execution)");
}
