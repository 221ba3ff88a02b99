// src/cli.rs

//! CLI argument parsing using `clap`.
//!
//! Everything after the first positional argument belongs to the command
//! being supervised, so `sherlock --once /bin/date -u` passes `-u` to
//! `/bin/date`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Command-line arguments for `sherlock`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "sherlock",
    version,
    about = "Distributed mutex for running commands, using memcached as the lock store.",
    long_about = "Given the same command on multiple hosts, sherlock makes sure only one \
                  of them runs it at a time. Particularly useful with cron jobs."
)]
pub struct CliArgs {
    /// Do not run the command if the lock is held by somebody else.
    #[arg(long, overrides_with = "no_once")]
    pub once: bool,

    /// Wait for the lock even if the config file sets `once`.
    #[arg(long, overrides_with = "once")]
    pub no_once: bool,

    /// Key used as the lock in memcached.
    #[arg(long, value_name = "KEY", env = "MEMCACHE_KEY")]
    pub memcache_key: Option<String>,

    /// Comma separated list of memcached servers (`host:port`).
    #[arg(long, value_name = "LIST", env = "MEMCACHE_SERVERS")]
    pub memcache_servers: Option<String>,

    /// Pause between attempts while the lock is held elsewhere.
    #[arg(long, value_name = "MS")]
    pub retry_interval_ms: Option<u64>,

    /// Timeout for each memcached connect / request.
    #[arg(long, value_name = "MS")]
    pub store_timeout_ms: Option<u64>,

    /// Capture the command's stdout/stderr and log them when it exits.
    #[arg(long, overrides_with = "no_capture_output")]
    pub capture_output: bool,

    /// Let the command write to the terminal even if the config file
    /// enables capturing.
    #[arg(long, overrides_with = "capture_output")]
    pub no_capture_output: bool,

    /// Optional TOML config file. Flags and env vars take precedence.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Append log messages to this file instead of stderr.
    #[arg(long, value_name = "PATH")]
    pub logfile: Option<PathBuf>,

    /// More verbose output (same as `--log-level debug`).
    #[arg(long, short)]
    pub verbose: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `--verbose`, `SHERLOCK_LOG` or a default level is used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// The command to run, followed by its arguments.
    #[arg(
        required = true,
        trailing_var_arg = true,
        allow_hyphen_values = true,
        value_name = "COMMAND"
    )]
    pub command: Vec<String>,
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
