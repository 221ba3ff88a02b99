// src/config/validate.rs

use std::time::Duration;

use crate::config::model::{RawRunConfig, RunConfiguration};
use crate::errors::{Result, SherlockError};
use crate::lock::LockSettings;
use crate::store::validate_key;
use crate::supervisor::{CommandSpec, OutputMode};

impl TryFrom<RawRunConfig> for RunConfiguration {
    type Error = SherlockError;

    fn try_from(raw: RawRunConfig) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;

        let command = CommandSpec::from_argv(&raw.command)
            .ok_or_else(|| SherlockError::ConfigError("no command specified".to_string()))?;
        let lock = LockSettings {
            key: raw.key,
            retry: !raw.once,
            retry_interval: Duration::from_millis(raw.retry_interval_ms),
        };
        let output = if raw.capture_output {
            OutputMode::Capture
        } else {
            OutputMode::Inherit
        };

        Ok(RunConfiguration::new_unchecked(
            lock,
            raw.servers,
            Duration::from_millis(raw.store_timeout_ms),
            command,
            output,
        ))
    }
}

fn validate_raw_config(cfg: &RawRunConfig) -> Result<()> {
    ensure_has_command(cfg)?;
    validate_key(&cfg.key).map_err(|e| SherlockError::ConfigError(e.to_string()))?;
    validate_servers(cfg)?;
    validate_timings(cfg)?;
    Ok(())
}

fn ensure_has_command(cfg: &RawRunConfig) -> Result<()> {
    match cfg.command.first() {
        Some(program) if !program.is_empty() => Ok(()),
        _ => Err(SherlockError::ConfigError(
            "no command specified; see --help".to_string(),
        )),
    }
}

fn validate_servers(cfg: &RawRunConfig) -> Result<()> {
    if cfg.servers.is_empty() {
        return Err(SherlockError::ConfigError(
            "at least one memcache server is required".to_string(),
        ));
    }

    for server in cfg.servers.iter() {
        let valid = match server.rsplit_once(':') {
            Some((host, port)) => !host.is_empty() && port.parse::<u16>().is_ok(),
            None => false,
        };
        if !valid {
            return Err(SherlockError::ConfigError(format!(
                "invalid memcache server '{}' (expected host:port)",
                server
            )));
        }
    }
    Ok(())
}

fn validate_timings(cfg: &RawRunConfig) -> Result<()> {
    if cfg.retry_interval_ms == 0 {
        return Err(SherlockError::ConfigError(
            "retry interval must be >= 1ms (got 0)".to_string(),
        ));
    }
    if cfg.store_timeout_ms == 0 {
        return Err(SherlockError::ConfigError(
            "store timeout must be >= 1ms (got 0)".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(command: &[&str]) -> RawRunConfig {
        RawRunConfig {
            command: command.iter().map(|s| s.to_string()).collect(),
            ..RawRunConfig::default()
        }
    }

    fn config_error(raw: RawRunConfig) -> String {
        match RunConfiguration::try_from(raw) {
            Err(SherlockError::ConfigError(msg)) => msg,
            Err(e) => panic!("expected ConfigError, got {e:?}"),
            Ok(cfg) => panic!("expected error, got {cfg:?}"),
        }
    }

    #[test]
    fn builds_immutable_configuration() {
        let mut r = raw(&["/bin/date", "-u"]);
        r.once = true;
        r.capture_output = true;

        let cfg = RunConfiguration::try_from(r).unwrap();
        assert_eq!(cfg.key(), "mutex-default");
        assert!(!cfg.retry());
        assert_eq!(cfg.lock().retry_interval, Duration::from_millis(100));
        assert_eq!(cfg.command().program, "/bin/date");
        assert_eq!(cfg.command().args, vec!["-u".to_string()]);
        assert_eq!(cfg.output(), OutputMode::Capture);
    }

    #[test]
    fn missing_command_is_rejected() {
        assert!(config_error(raw(&[])).contains("no command"));
    }

    #[test]
    fn illegal_key_is_rejected() {
        let mut r = raw(&["true"]);
        r.key = "two words".to_string();
        assert!(config_error(r).contains("invalid key"));
    }

    #[test]
    fn malformed_servers_are_rejected() {
        for servers in [vec![], vec!["localhost".to_string()], vec![":11211".to_string()], vec!["h:port".to_string()]] {
            let mut r = raw(&["true"]);
            r.servers = servers;
            let msg = config_error(r);
            assert!(msg.contains("server"), "{msg}");
        }
    }

    #[test]
    fn zero_timings_are_rejected() {
        let mut r = raw(&["true"]);
        r.retry_interval_ms = 0;
        assert!(config_error(r).contains("retry interval"));

        let mut r = raw(&["true"]);
        r.store_timeout_ms = 0;
        assert!(config_error(r).contains("store timeout"));
    }
}
