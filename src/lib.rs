// src/lib.rs

pub mod cli;
pub mod config;
pub mod coordinator;
pub mod errors;
pub mod exit_codes;
pub mod lock;
pub mod logging;
pub mod store;
pub mod supervisor;

use std::sync::Arc;

use tracing::{debug, info};

use crate::config::RunConfiguration;
use crate::coordinator::Coordinator;
use crate::lock::LockManager;
use crate::store::MemcacheStore;
use crate::supervisor::OsSignals;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - the memcached-backed lock store
/// - the lock manager for the configured key
/// - the coordinator, with real OS signals
///
/// and returns the exit status for this process.
pub async fn run(config: RunConfiguration) -> i32 {
    info!(command = %config.command(), key = config.key(), "sherlock starting");
    debug!(
        servers = ?config.servers(),
        retry = config.retry(),
        timeout = ?config.store_timeout(),
        "lock store settings"
    );

    let store = MemcacheStore::new(config.servers().to_vec(), config.store_timeout());
    let lock = LockManager::new(Arc::new(store), config.lock().clone());

    Coordinator::new(&config, lock, OsSignals).run().await
}
