#![allow(dead_code)]

use sherlock::config::{RawRunConfig, RunConfiguration};

/// Builder for `RunConfiguration` to simplify test setup.
pub struct RunConfigBuilder {
    raw: RawRunConfig,
}

impl RunConfigBuilder {
    /// Start from defaults with the given command line.
    pub fn new(command: &[&str]) -> Self {
        Self {
            raw: RawRunConfig {
                command: command.iter().map(|s| s.to_string()).collect(),
                ..RawRunConfig::default()
            },
        }
    }

    /// Run `script` through `sh -c`.
    pub fn shell(script: &str) -> Self {
        Self::new(&["sh", "-c", script])
    }

    pub fn key(mut self, key: &str) -> Self {
        self.raw.key = key.to_string();
        self
    }

    pub fn servers(mut self, servers: &[&str]) -> Self {
        self.raw.servers = servers.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn once(mut self, once: bool) -> Self {
        self.raw.once = once;
        self
    }

    pub fn retry_interval_ms(mut self, ms: u64) -> Self {
        self.raw.retry_interval_ms = ms;
        self
    }

    pub fn store_timeout_ms(mut self, ms: u64) -> Self {
        self.raw.store_timeout_ms = ms;
        self
    }

    pub fn capture_output(mut self, capture: bool) -> Self {
        self.raw.capture_output = capture;
        self
    }

    pub fn build(self) -> RunConfiguration {
        RunConfiguration::try_from(self.raw).expect("Failed to build valid config from builder")
    }
}
