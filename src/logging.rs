// src/logging.rs

//! Logging setup for `keep-testing` using `tracing` + `tracing-subscriber`.
//!
//! Priority for determining the log level:
//! 1. `--log-level` CLI flag (if provided)
//! 2. `--debug`
//! 3. `KEEP_TESTING_LOG` environment variable (e.g. "info", "debug")
//! 4. default to `info`
//!
//! Logs go to stderr; stdout belongs to the commands being run.

use anyhow::Result;
use tracing_subscriber::fmt;

use crate::cli::LogLevel;

pub const LOG_ENV_VAR: &str = "KEEP_TESTING_LOG";

/// Initialise global logging subscriber.
///
/// Safe to call once at startup.
pub fn init_logging(cli_level: Option<LogLevel>, debug: bool) -> Result<()> {
    let env_level = std::env::var(LOG_ENV_VAR).ok();
    let level = resolve_level(cli_level, debug, env_level.as_deref());

    fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .try_init()
        .map_err(|err| anyhow::anyhow!("failed to install logging subscriber: {err}"))?;

    Ok(())
}

/// Pick the effective level from the three possible sources.
pub fn resolve_level(
    cli_level: Option<LogLevel>,
    debug: bool,
    env_level: Option<&str>,
) -> tracing::Level {
    match cli_level {
        Some(lvl) => level_from_log_level(lvl),
        None if debug => tracing::Level::DEBUG,
        None => env_level
            .and_then(parse_level_str)
            .unwrap_or(tracing::Level::INFO),
    }
}

fn level_from_log_level(lvl: LogLevel) -> tracing::Level {
    match lvl {
        LogLevel::Error => tracing::Level::ERROR,
        LogLevel::Warn => tracing::Level::WARN,
        LogLevel::Info => tracing::Level::INFO,
        LogLevel::Debug => tracing::Level::DEBUG,
        LogLevel::Trace => tracing::Level::TRACE,
    }
}

fn parse_level_str(s: &str) -> Option<tracing::Level> {
    match s.trim().to_lowercase().as_str() {
        "error" => Some(tracing::Level::ERROR),
        "warn" | "warning" => Some(tracing::Level::WARN),
        "info" => Some(tracing::Level::INFO),
        "debug" => Some(tracing::Level::DEBUG),
        "trace" => Some(tracing::Level::TRACE),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_level_wins_over_everything() {
        let level = resolve_level(Some(LogLevel::Warn), true, Some("trace"));
        assert_eq!(level, tracing::Level::WARN);
    }

    #[test]
    fn debug_flag_wins_over_env() {
        assert_eq!(resolve_level(None, true, Some("error")), tracing::Level::DEBUG);
    }

    #[test]
    fn env_then_default() {
        assert_eq!(resolve_level(None, false, Some(" Warning ")), tracing::Level::WARN);
        assert_eq!(resolve_level(None, false, Some("bogus")), tracing::Level::INFO);
        assert_eq!(resolve_level(None, false, None), tracing::Level::INFO);
    }
}
