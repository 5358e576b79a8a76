// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Command-line arguments for `keep-testing`.
#[derive(Debug, Clone, Default, Parser)]
#[command(
    name = "keep-testing",
    version,
    about = "Re-run a list of commands whenever watched files change or <ENTER> is pressed.",
    long_about = None
)]
pub struct CliArgs {
    /// Shell commands to run, in order. A pass stops at the first failure.
    #[arg(short = 'c', long = "cmds", value_name = "CMD", num_args = 1..)]
    pub cmds: Vec<String>,

    /// Directories to watch recursively.
    #[arg(short = 'd', long = "dirs", value_name = "DIR", num_args = 1..)]
    pub dirs: Vec<PathBuf>,

    /// Individual files to watch.
    #[arg(short = 'f', long = "files", value_name = "FILE", num_args = 1..)]
    pub files: Vec<PathBuf>,

    /// Regular expressions matched against the whole absolute path; matching
    /// files and directories are not watched.
    #[arg(short = 'i', long = "ignores", value_name = "REGEX", num_args = 1..)]
    pub ignores: Vec<String>,

    /// Seconds to sleep between two notification polls [default: 0.2].
    #[arg(short = 's', long = "sleep", value_name = "SECS")]
    pub sleep: Option<f64>,

    /// Seconds between two full rescans while waiting [default: 5.0].
    #[arg(long, value_name = "SECS")]
    pub rescan: Option<f64>,

    /// Optional TOML file with the same keys as the list flags.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Run the commands once and exit with their status.
    #[arg(short = '1', long)]
    pub once: bool,

    /// Also treat a modification-time change as a change.
    #[arg(long)]
    pub strict: bool,

    /// Shorthand for `--log-level debug`.
    #[arg(long)]
    pub debug: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `--debug`, `KEEP_TESTING_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Resolve and validate settings, print them, but don't execute anything.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
