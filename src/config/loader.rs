// src/config/loader.rs

use std::fs;
use std::path::Path;

use crate::cli::CliArgs;
use crate::config::model::{ConfigFile, RawRunConfig, RunConfiguration};
use crate::errors::Result;

/// Load a TOML config file.
///
/// This only performs deserialization; semantic checks happen when the
/// merged values are turned into a [`RunConfiguration`].
pub fn load_from_path(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let contents = fs::read_to_string(path.as_ref())?;
    let config: ConfigFile = toml::from_str(&contents)?;
    Ok(config)
}

/// Load the config file if one was given, otherwise an empty one.
pub fn load_optional(path: Option<&Path>) -> Result<ConfigFile> {
    match path {
        Some(path) => load_from_path(path),
        None => Ok(ConfigFile::default()),
    }
}

/// Merge defaults, the config file and CLI/env values (in increasing
/// precedence) and validate the result.
pub fn resolve(args: &CliArgs, file: &ConfigFile) -> Result<RunConfiguration> {
    let raw = merge(args, file);
    RunConfiguration::try_from(raw)
}

fn merge(args: &CliArgs, file: &ConfigFile) -> RawRunConfig {
    let mut raw = RawRunConfig::default();

    let lock = &file.lock;
    if let Some(key) = &lock.key {
        raw.key = key.clone();
    }
    if let Some(servers) = &lock.servers {
        raw.servers = servers.clone();
    }
    if let Some(once) = lock.once {
        raw.once = once;
    }
    if let Some(ms) = lock.retry_interval_ms {
        raw.retry_interval_ms = ms;
    }
    if let Some(ms) = lock.store_timeout_ms {
        raw.store_timeout_ms = ms;
    }
    if let Some(capture) = file.process.capture_output {
        raw.capture_output = capture;
    }

    if let Some(key) = &args.memcache_key {
        raw.key = key.clone();
    }
    if let Some(servers) = &args.memcache_servers {
        raw.servers = split_servers(servers);
    }
    if let Some(ms) = args.retry_interval_ms {
        raw.retry_interval_ms = ms;
    }
    if let Some(ms) = args.store_timeout_ms {
        raw.store_timeout_ms = ms;
    }
    if args.once {
        raw.once = true;
    } else if args.no_once {
        raw.once = false;
    }
    if args.capture_output {
        raw.capture_output = true;
    } else if args.no_capture_output {
        raw.capture_output = false;
    }
    raw.command = args.command.clone();

    raw
}

/// `"a:1, b:2,"` -> `["a:1", "b:2"]`
pub fn split_servers(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;
    use crate::config::model::{DEFAULT_KEY, LockSection, ProcessSection};

    fn args(argv: &[&str]) -> CliArgs {
        CliArgs::try_parse_from(argv).unwrap()
    }

    #[test]
    fn splits_server_lists() {
        assert_eq!(
            split_servers("a:1, b:2,,"),
            vec!["a:1".to_string(), "b:2".to_string()]
        );
    }

    #[test]
    fn file_values_fill_in_unset_flags() {
        let file = ConfigFile {
            lock: LockSection {
                key: Some("from-file".to_string()),
                servers: Some(vec!["10.0.0.9:11211".to_string()]),
                once: Some(true),
                retry_interval_ms: Some(50),
                store_timeout_ms: None,
            },
            ..ConfigFile::default()
        };
        let raw = merge(
            &args(&["sherlock", "--memcache-key", "from-cli", "echo", "hi"]),
            &file,
        );
        assert_eq!(raw.key, "from-cli");
        assert_eq!(raw.servers, vec!["10.0.0.9:11211".to_string()]);
        assert!(raw.once);
        assert_eq!(raw.retry_interval_ms, 50);
        assert_eq!(raw.command, vec!["echo".to_string(), "hi".to_string()]);
    }

    #[test]
    fn negative_flags_override_the_file() {
        let file = ConfigFile {
            lock: LockSection {
                once: Some(true),
                ..LockSection::default()
            },
            process: ProcessSection {
                capture_output: Some(true),
            },
            ..ConfigFile::default()
        };

        let raw = merge(&args(&["sherlock", "true"]), &file);
        assert!(raw.once);
        assert!(raw.capture_output);

        let raw = merge(
            &args(&["sherlock", "--no-once", "--no-capture-output", "true"]),
            &file,
        );
        assert!(!raw.once);
        assert!(!raw.capture_output);
    }

    #[test]
    fn defaults_apply_without_file() {
        let raw = merge(&args(&["sherlock", "true"]), &ConfigFile::default());
        if std::env::var_os("MEMCACHE_KEY").is_none() {
            assert_eq!(raw.key, DEFAULT_KEY);
        }
        assert!(!raw.once);
        assert_eq!(raw.retry_interval_ms, 100);
    }
}
