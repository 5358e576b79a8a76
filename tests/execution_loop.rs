// tests/execution_loop.rs

mod common;
use crate::common::fakes::{FakeNotifications, FakeRunner};
use crate::common::{init_tracing, temp_root, with_timeout, write_file};

use std::error::Error;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};

use keep_testing::engine::{
    ExecutionLoop, LoopEvent, LoopOptions, PassOutcome, PassReason, event_channel,
};
use keep_testing::fs::mock::MockFileSystem;
use keep_testing::trigger::ManualTrigger;
use keep_testing::types::{ChangeDescriptor, FingerprintPolicy};
use keep_testing::watch::{IgnoreSet, WatchSet};

type TestResult = Result<(), Box<dyn Error>>;

fn fast_options() -> LoopOptions {
    LoopOptions {
        run_once: false,
        poll_interval: Duration::from_millis(10),
        rescan_interval: Duration::from_secs(60),
    }
}

fn project() -> MockFileSystem {
    let fs = MockFileSystem::new();
    fs.add_file("/proj/src/main.go", b"package main".to_vec());
    fs
}

fn watch_set(fs: &MockFileSystem) -> WatchSet {
    WatchSet::with_fs(
        Arc::new(fs.clone()),
        &[],
        &[PathBuf::from("/proj/src")],
        IgnoreSet::default(),
        FingerprintPolicy::Content,
    )
}

/// Read events until one matches `pred`; returns everything read.
async fn wait_for<F>(rx: &mut mpsc::UnboundedReceiver<LoopEvent>, pred: F) -> Vec<LoopEvent>
where
    F: Fn(&LoopEvent) -> bool,
{
    let mut seen = Vec::new();
    while let Some(event) = rx.recv().await {
        let done = pred(&event);
        seen.push(event);
        if done {
            return seen;
        }
    }
    panic!("event stream closed early; saw {seen:?}");
}

fn is_waiting(event: &LoopEvent) -> bool {
    matches!(event, LoopEvent::Waiting)
}

#[tokio::test]
async fn startup_pass_then_subscription_over_covering_set() -> TestResult {
    init_tracing();
    let fs = project();
    let runner = FakeRunner::new();
    let executed = runner.executed();
    let notifications = FakeNotifications::new();
    let (events, mut rx) = event_channel();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let exec_loop = ExecutionLoop::new(fast_options(), vec!["make".into()], watch_set(&fs), runner)
        .with_notifications(Box::new(notifications.clone()))
        .with_events(events)
        .with_shutdown(shutdown_rx);
    assert_eq!(exec_loop.covering(), &[PathBuf::from("/proj/src")]);
    let handle = tokio::spawn(exec_loop.run());

    let seen = with_timeout(wait_for(&mut rx, is_waiting)).await;
    assert_eq!(
        seen,
        vec![
            LoopEvent::PassStarted { reason: PassReason::Startup },
            LoopEvent::CommandStarted { index: 0, command: "make".into() },
            LoopEvent::CommandSucceeded { command: "make".into() },
            LoopEvent::PassFinished { outcome: PassOutcome::Success },
            LoopEvent::NotificationsEstablished { dirs: vec![PathBuf::from("/proj/src")] },
            LoopEvent::Waiting,
        ]
    );
    assert_eq!(notifications.subscriptions(), vec![vec![PathBuf::from("/proj/src")]]);
    assert_eq!(*executed.lock().unwrap(), vec!["make"]);

    shutdown_tx.send(true)?;
    let status = with_timeout(handle).await??;
    assert_eq!(status, 0);
    Ok(())
}

#[tokio::test]
async fn confirmed_change_runs_a_pass() -> TestResult {
    init_tracing();
    let fs = project();
    let runner = FakeRunner::new();
    let executed = runner.executed();
    let notifications = FakeNotifications::new();
    let (events, mut rx) = event_channel();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let handle = tokio::spawn(
        ExecutionLoop::new(fast_options(), vec!["make".into()], watch_set(&fs), runner)
            .with_notifications(Box::new(notifications.clone()))
            .with_events(events)
            .with_shutdown(shutdown_rx)
            .run(),
    );
    with_timeout(wait_for(&mut rx, is_waiting)).await;

    fs.add_file("/proj/src/main.go", b"package main // edited".to_vec());
    notifications.notify();

    let seen = with_timeout(wait_for(&mut rx, |e| {
        matches!(e, LoopEvent::PassFinished { .. })
    }))
    .await;
    assert!(seen.contains(&LoopEvent::ChangesDetected {
        changes: vec![ChangeDescriptor::changed(std::path::Path::new("/proj/src/main.go"))],
    }));
    assert!(seen.contains(&LoopEvent::PassStarted { reason: PassReason::FilesChanged }));
    assert_eq!(executed.lock().unwrap().len(), 2);

    shutdown_tx.send(true)?;
    assert_eq!(with_timeout(handle).await??, 0);
    Ok(())
}

#[tokio::test]
async fn unconfirmed_notification_does_not_run_a_pass() -> TestResult {
    init_tracing();
    let fs = project();
    let runner = FakeRunner::new();
    let executed = runner.executed();
    let notifications = FakeNotifications::new();
    let (events, mut rx) = event_channel();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let handle = tokio::spawn(
        ExecutionLoop::new(fast_options(), vec!["make".into()], watch_set(&fs), runner)
            .with_notifications(Box::new(notifications.clone()))
            .with_events(events)
            .with_shutdown(shutdown_rx)
            .run(),
    );
    with_timeout(wait_for(&mut rx, is_waiting)).await;

    // Nothing on disk changed: the rescan finds nothing, the loop only
    // renews its subscription.
    notifications.notify();
    with_timeout(wait_for(&mut rx, is_waiting)).await;

    assert_eq!(executed.lock().unwrap().len(), 1);
    assert_eq!(notifications.subscriptions().len(), 2);

    shutdown_tx.send(true)?;
    assert_eq!(with_timeout(handle).await??, 0);
    Ok(())
}

#[tokio::test]
async fn manual_trigger_forces_a_pass_without_changes() -> TestResult {
    init_tracing();
    let fs = project();
    let runner = FakeRunner::new();
    let executed = runner.executed();
    let trigger = ManualTrigger::new();
    let (events, mut rx) = event_channel();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let handle = tokio::spawn(
        ExecutionLoop::new(fast_options(), vec!["make".into()], watch_set(&fs), runner)
            .with_notifications(Box::new(FakeNotifications::new()))
            .with_trigger(trigger.clone())
            .with_events(events)
            .with_shutdown(shutdown_rx)
            .run(),
    );
    with_timeout(wait_for(&mut rx, is_waiting)).await;

    trigger.fire();
    let seen = with_timeout(wait_for(&mut rx, |e| {
        matches!(e, LoopEvent::PassFinished { .. })
    }))
    .await;
    assert!(seen.contains(&LoopEvent::ManualTriggered));
    assert!(seen.contains(&LoopEvent::PassStarted { reason: PassReason::ManualTrigger }));
    assert!(!seen.iter().any(|e| matches!(e, LoopEvent::ChangesDetected { .. })));
    assert!(!trigger.is_set());
    assert_eq!(executed.lock().unwrap().len(), 2);

    shutdown_tx.send(true)?;
    assert_eq!(with_timeout(handle).await??, 0);
    Ok(())
}

#[tokio::test]
async fn trigger_raised_during_a_pass_is_discarded() -> TestResult {
    init_tracing();
    let fs = project();
    let runner = FakeRunner::new().with_delay(Duration::from_millis(100));
    let executed = runner.executed();
    let trigger = ManualTrigger::new();
    let (events, mut rx) = event_channel();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let handle = tokio::spawn(
        ExecutionLoop::new(fast_options(), vec!["make".into()], watch_set(&fs), runner)
            .with_notifications(Box::new(FakeNotifications::new()))
            .with_trigger(trigger.clone())
            .with_events(events)
            .with_shutdown(shutdown_rx)
            .run(),
    );

    with_timeout(wait_for(&mut rx, |e| matches!(e, LoopEvent::CommandStarted { .. }))).await;
    trigger.fire();
    with_timeout(wait_for(&mut rx, is_waiting)).await;

    // Several poll intervals later there still was only the startup pass.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(executed.lock().unwrap().len(), 1);

    shutdown_tx.send(true)?;
    assert_eq!(with_timeout(handle).await??, 0);
    Ok(())
}

#[tokio::test]
async fn shutdown_during_a_pass_exits_zero() -> TestResult {
    init_tracing();
    let fs = project();
    let runner = FakeRunner::new().with_delay(Duration::from_secs(30)).failing("make");
    let (events, mut rx) = event_channel();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let handle = tokio::spawn(
        ExecutionLoop::new(fast_options(), vec!["make".into()], watch_set(&fs), runner)
            .with_notifications(Box::new(FakeNotifications::new()))
            .with_events(events)
            .with_shutdown(shutdown_rx)
            .run(),
    );

    with_timeout(wait_for(&mut rx, |e| matches!(e, LoopEvent::CommandStarted { .. }))).await;
    shutdown_tx.send(true)?;

    assert_eq!(with_timeout(handle).await??, 0);
    let rest = with_timeout(wait_for(&mut rx, |e| matches!(e, LoopEvent::ShutdownRequested))).await;
    assert!(!rest.iter().any(|e| matches!(e, LoopEvent::PassFinished { .. })));
    Ok(())
}

#[tokio::test]
async fn run_once_mirrors_the_pass_status() -> TestResult {
    init_tracing();
    let options = LoopOptions {
        run_once: true,
        ..fast_options()
    };
    let fs = MockFileSystem::new();
    let empty = || WatchSet::with_fs(Arc::new(fs.clone()), &[], &[], IgnoreSet::default(), FingerprintPolicy::Content);

    let ok = ExecutionLoop::new(options, vec!["true".into()], empty(), FakeRunner::new());
    assert_eq!(with_timeout(ok.run()).await?, 0);

    let runner = FakeRunner::new().failing("false");
    let executed = runner.executed();
    let failing = ExecutionLoop::new(
        options,
        vec!["true".into(), "false".into(), "true".into()],
        empty(),
        runner,
    );
    assert_eq!(with_timeout(failing.run()).await?, 1);
    assert_eq!(*executed.lock().unwrap(), vec!["true", "false"]);
    Ok(())
}

#[tokio::test]
async fn degraded_notifications_still_detect_changes() -> TestResult {
    init_tracing();
    let fs = project();
    let runner = FakeRunner::new();
    let executed = runner.executed();
    let (events, mut rx) = event_channel();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let options = LoopOptions {
        rescan_interval: Duration::from_millis(50),
        ..fast_options()
    };

    let handle = tokio::spawn(
        ExecutionLoop::new(options, vec!["make".into()], watch_set(&fs), runner)
            .with_notifications(Box::new(FakeNotifications::broken()))
            .with_events(events)
            .with_shutdown(shutdown_rx)
            .run(),
    );

    let seen = with_timeout(wait_for(&mut rx, is_waiting)).await;
    assert!(seen.iter().any(|e| matches!(e, LoopEvent::NotificationsDegraded { .. })));
    assert!(!seen.iter().any(|e| matches!(e, LoopEvent::NotificationsEstablished { .. })));

    fs.add_file("/proj/src/new.go", b"package main".to_vec());
    let seen = with_timeout(wait_for(&mut rx, |e| {
        matches!(e, LoopEvent::PassFinished { .. })
    }))
    .await;
    assert!(seen.contains(&LoopEvent::ChangesDetected {
        changes: vec![ChangeDescriptor::created(std::path::Path::new("/proj/src/new.go"))],
    }));
    assert!(seen.contains(&LoopEvent::PassStarted { reason: PassReason::FilesChanged }));

    shutdown_tx.send(true)?;
    assert_eq!(with_timeout(handle).await??, 0);
    assert_eq!(executed.lock().unwrap().len(), 2);
    Ok(())
}

#[tokio::test]
async fn notifications_recover_once_subscribing_works_again() -> TestResult {
    init_tracing();
    let fs = project();
    let runner = FakeRunner::new();
    let notifications = FakeNotifications::broken();
    let (events, mut rx) = event_channel();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let options = LoopOptions {
        rescan_interval: Duration::from_millis(50),
        ..fast_options()
    };

    let handle = tokio::spawn(
        ExecutionLoop::new(options, vec!["make".into()], watch_set(&fs), runner)
            .with_notifications(Box::new(notifications.clone()))
            .with_events(events)
            .with_shutdown(shutdown_rx)
            .run(),
    );
    let seen = with_timeout(wait_for(&mut rx, is_waiting)).await;
    assert!(seen.iter().any(|e| matches!(e, LoopEvent::NotificationsDegraded { .. })));

    // The polling stand-in fires, and the next subscription succeeds.
    notifications.set_broken(false);
    let seen = with_timeout(wait_for(&mut rx, |e| {
        matches!(e, LoopEvent::NotificationsEstablished { .. })
    }))
    .await;
    assert_eq!(
        seen.iter()
            .filter(|e| matches!(e, LoopEvent::NotificationsDegraded { .. }))
            .count(),
        0,
        "repeated failures are reported once"
    );
    assert_eq!(notifications.subscriptions(), vec![vec![PathBuf::from("/proj/src")]]);

    shutdown_tx.send(true)?;
    assert_eq!(with_timeout(handle).await??, 0);
    Ok(())
}

#[tokio::test]
async fn missing_root_keeps_notifications_for_the_others() -> TestResult {
    init_tracing();
    let (_tmp, root) = temp_root();
    let a = root.join("a");
    let b = root.join("b");
    write_file(&a, "x.go", "package a");
    fs::create_dir_all(&b)?;
    let watch_set = WatchSet::new(
        &[],
        &[a.clone(), b.clone()],
        IgnoreSet::default(),
        FingerprintPolicy::Content,
    );
    fs::remove_dir(&b)?;

    let runner = FakeRunner::new();
    let (events, mut rx) = event_channel();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Rescans are far away: only kernel notifications can be this fast.
    let handle = tokio::spawn(
        ExecutionLoop::new(fast_options(), vec!["make".into()], watch_set, runner)
            .with_events(events)
            .with_shutdown(shutdown_rx)
            .run(),
    );
    let seen = with_timeout(wait_for(&mut rx, is_waiting)).await;
    assert!(!seen.iter().any(|e| matches!(e, LoopEvent::NotificationsDegraded { .. })));
    assert!(seen.iter().any(|e| matches!(e, LoopEvent::NotificationsEstablished { .. })));

    // `b` comes back unseen; the edit in `a` is what wakes the loop.
    fs::create_dir_all(&b)?;
    write_file(&a, "x.go", "package a // edited");
    let seen = with_timeout(wait_for(&mut rx, |e| {
        matches!(e, LoopEvent::PassFinished { .. })
    }))
    .await;
    assert!(seen.contains(&LoopEvent::PassStarted { reason: PassReason::FilesChanged }));

    // The pass renewed the subscription, which now covers `b` again.
    with_timeout(wait_for(&mut rx, is_waiting)).await;
    let created = ChangeDescriptor::created(&b.join("y.go"));
    write_file(&b, "y.go", "package b");
    with_timeout(wait_for(&mut rx, |e| {
        matches!(e, LoopEvent::ChangesDetected { changes } if changes.contains(&created))
    }))
    .await;

    shutdown_tx.send(true)?;
    assert_eq!(with_timeout(handle).await??, 0);
    Ok(())
}
