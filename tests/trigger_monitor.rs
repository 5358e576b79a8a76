// tests/trigger_monitor.rs

mod common;
use crate::common::fakes::ChannelInput;
use crate::common::init_tracing;

use std::error::Error;
use std::time::{Duration, Instant};

use keep_testing::trigger::{ManualTrigger, TriggerMonitor};

type TestResult = Result<(), Box<dyn Error>>;

const INPUT_TIMEOUT: Duration = Duration::from_millis(20);

fn wait_until(mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    false
}

#[test]
fn take_clears_the_flag() {
    let trigger = ManualTrigger::new();
    assert!(!trigger.take());

    let clone = trigger.clone();
    clone.fire();
    assert!(trigger.is_set());
    assert!(trigger.take());
    assert!(!trigger.take());
    assert!(!clone.is_set());
}

#[test]
fn line_on_input_fires_the_trigger() -> TestResult {
    init_tracing();
    let (tx, input) = ChannelInput::new();
    let trigger = ManualTrigger::new();
    let mut monitor = TriggerMonitor::spawn_with(input, trigger.clone(), INPUT_TIMEOUT)?;

    tx.send(())?;
    assert!(wait_until(|| trigger.take()));

    monitor.stop();
    assert!(!monitor.is_running());
    Ok(())
}

#[test]
fn stop_joins_an_idle_monitor_promptly() -> TestResult {
    let (_tx, input) = ChannelInput::new();
    let mut monitor = TriggerMonitor::spawn_with(input, ManualTrigger::new(), INPUT_TIMEOUT)?;
    assert!(monitor.is_running());

    let started = Instant::now();
    monitor.stop();
    assert!(started.elapsed() < Duration::from_secs(1));
    assert!(!monitor.is_running());
    Ok(())
}

#[test]
fn end_of_input_stops_the_monitor_by_itself() -> TestResult {
    let (tx, input) = ChannelInput::new();
    let trigger = ManualTrigger::new();
    let monitor = TriggerMonitor::spawn_with(input, trigger.clone(), INPUT_TIMEOUT)?;

    drop(tx);
    assert!(wait_until(|| !monitor.is_running()));
    assert!(!trigger.is_set());
    Ok(())
}
