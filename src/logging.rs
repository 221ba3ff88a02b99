// src/logging.rs

//! Logging setup for `sherlock` using `tracing` + `tracing-subscriber`.
//!
//! Priority for determining the log level:
//! 1. `--log-level` CLI flag (if provided)
//! 2. `--verbose` (debug)
//! 3. `[log].level` in the config file
//! 4. `SHERLOCK_LOG` environment variable (e.g. "info", "debug")
//! 5. default to `info`
//!
//! Logs go to STDERR by default so the supervised command owns stdout. With
//! `--logfile` they are appended to that file instead.

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing_subscriber::fmt;

use crate::cli::{CliArgs, LogLevel};
use crate::config::ConfigFile;

/// Where and how verbosely to log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub level: tracing::Level,
    pub file: Option<PathBuf>,
}

impl LogSettings {
    pub fn resolve(args: &CliArgs, file: &ConfigFile) -> Self {
        let level = args
            .log_level
            .map(level_from_log_level)
            .or_else(|| args.verbose.then_some(tracing::Level::DEBUG))
            .or_else(|| file.log.level.as_deref().and_then(parse_level_str))
            .or_else(|| {
                std::env::var("SHERLOCK_LOG")
                    .ok()
                    .and_then(|s| parse_level_str(&s))
            })
            .unwrap_or(tracing::Level::INFO);

        Self {
            level,
            file: args.logfile.clone().or_else(|| file.log.file.clone()),
        }
    }
}

/// Initialise global logging subscriber.
///
/// Safe to call once at startup.
pub fn init_logging(settings: &LogSettings) -> Result<()> {
    let builder = fmt()
        .with_max_level(settings.level)
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false);

    match &settings.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("cannot open log file {}", path.display()))?;
            builder.with_ansi(false).with_writer(Mutex::new(file)).init();
        }
        None => builder.with_writer(std::io::stderr).init(),
    }

    Ok(())
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
