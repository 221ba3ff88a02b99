// src/config/model.rs

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::lock::{DEFAULT_RETRY_INTERVAL, LockSettings};
use crate::supervisor::{CommandSpec, OutputMode};

pub const DEFAULT_KEY: &str = "mutex-default";
pub const DEFAULT_SERVER: &str = "127.0.0.1:11211";
pub const DEFAULT_STORE_TIMEOUT_MS: u64 = 1000;

/// Optional TOML config file.
///
/// ```toml
/// [lock]
/// key = "nightly-report"
/// servers = ["10.0.0.1:11211", "10.0.0.2:11211"]
/// once = true
/// retry_interval_ms = 100
/// store_timeout_ms = 1000
///
/// [process]
/// capture_output = true
///
/// [log]
/// file = "/var/log/sherlock.log"
/// level = "debug"
/// ```
///
/// Every field is optional; CLI flags and env vars win over the file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub lock: LockSection,

    #[serde(default)]
    pub process: ProcessSection,

    #[serde(default)]
    pub log: LogSection,
}

/// `[lock]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LockSection {
    pub key: Option<String>,
    pub servers: Option<Vec<String>>,
    pub once: Option<bool>,
    pub retry_interval_ms: Option<u64>,
    pub store_timeout_ms: Option<u64>,
}

/// `[process]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProcessSection {
    pub capture_output: Option<bool>,
}

/// `[log]` section. Consumed by `logging`, not by the core.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogSection {
    pub file: Option<PathBuf>,
    pub level: Option<String>,
}

/// Merged, not yet validated run settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRunConfig {
    pub key: String,
    pub servers: Vec<String>,
    pub once: bool,
    pub retry_interval_ms: u64,
    pub store_timeout_ms: u64,
    pub capture_output: bool,
    /// Program followed by its arguments.
    pub command: Vec<String>,
}

impl Default for RawRunConfig {
    fn default() -> Self {
        Self {
            key: DEFAULT_KEY.to_string(),
            servers: vec![DEFAULT_SERVER.to_string()],
            once: false,
            retry_interval_ms: DEFAULT_RETRY_INTERVAL.as_millis() as u64,
            store_timeout_ms: DEFAULT_STORE_TIMEOUT_MS,
            capture_output: false,
            command: Vec::new(),
        }
    }
}

/// Immutable settings for one run, built once and handed to the lock
/// manager and coordinator.
///
/// Only constructible through `TryFrom<RawRunConfig>`, which validates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfiguration {
    lock: LockSettings,
    servers: Vec<String>,
    store_timeout: Duration,
    command: CommandSpec,
    output: OutputMode,
}

impl RunConfiguration {
    pub(crate) fn new_unchecked(
        lock: LockSettings,
        servers: Vec<String>,
        store_timeout: Duration,
        command: CommandSpec,
        output: OutputMode,
    ) -> Self {
        Self {
            lock,
            servers,
            store_timeout,
            command,
            output,
        }
    }

    pub fn lock(&self) -> &LockSettings {
        &self.lock
    }

    pub fn key(&self) -> &str {
        &self.lock.key
    }

    /// Whether a contested lock is retried (false under `--once`).
    pub fn retry(&self) -> bool {
        self.lock.retry
    }

    pub fn servers(&self) -> &[String] {
        &self.servers
    }

    pub fn store_timeout(&self) -> Duration {
        self.store_timeout
    }

    pub fn command(&self) -> &CommandSpec {
        &self.command
    }

    pub fn output(&self) -> OutputMode {
        self.output
    }
}
