// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum SherlockError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Lock store error: {0}")]
    Store(#[from] StoreError),

    #[error("Failed to start process `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Waiting for process failed: {0}")]
    Wait(#[source] std::io::Error),

    #[error("Failed to deliver signal: {0}")]
    Signal(#[from] nix::errno::Errno),

    #[error("Process has already exited")]
    ProcessExited,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, SherlockError>;
