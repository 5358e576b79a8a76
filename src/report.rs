// src/report.rs

//! Human-facing log lines for [`LoopEvent`]s.

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::engine::{LoopEvent, PassOutcome};

/// Log every event until the loop drops its sender.
pub async fn report_events(mut rx: mpsc::UnboundedReceiver<LoopEvent>) {
    while let Some(event) = rx.recv().await {
        report(&event);
    }
    debug!("event stream closed");
}

/// Log a single event.
pub fn report(event: &LoopEvent) {
    match event {
        LoopEvent::PassStarted { reason } => debug!(?reason, "pass started"),
        LoopEvent::CommandStarted { command, .. } => info!("Executing: {command}"),
        LoopEvent::CommandSucceeded { command } => info!("Success: {command}"),
        LoopEvent::CommandFailed { command, code } => match code {
            Some(code) => error!(code, "Command failed: {command}"),
            None => error!("Command failed: {command}"),
        },
        LoopEvent::PassFinished { outcome } => match outcome {
            PassOutcome::Success => debug!("pass succeeded"),
            PassOutcome::Failed { command, .. } => debug!(%command, "pass failed"),
        },
        LoopEvent::ChangesDetected { changes } => {
            info!("Changes detected:");
            for change in changes {
                info!("- {change}");
            }
        }
        LoopEvent::ManualTriggered => debug!("manual trigger consumed"),
        LoopEvent::NotificationsEstablished { dirs } => {
            debug!(?dirs, "file notifications established")
        }
        LoopEvent::NotificationsDegraded { reason } => {
            warn!(%reason, "file notifications degraded; relying on periodic rescans")
        }
        LoopEvent::Waiting => info!("Monitoring dir changes and <ENTER> key presses"),
        LoopEvent::ShutdownRequested => info!("Shutdown requested"),
    }
}
