// src/lock/mod.rs

//! Lock manager: Acquire/Release on top of the store's create-if-absent.
//!
//! - A successful `add` means this process holds the lock.
//! - A key that already exists is a lost race. With retry enabled we sleep
//!   a fixed interval and try again forever; otherwise the caller gets
//!   [`Acquisition::Denied`], which is not an error.
//! - Transport/backend errors are returned straight away and never retried.
//!
//! There is no lease: a holder that dies without releasing leaves the key
//! behind until somebody deletes it by hand.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::store::{AddOutcome, DeleteOutcome, LockStore, StoreError, lock_value};

pub mod guard;

pub use guard::LockGuard;

/// Default pause between attempts while the lock is contested.
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_millis(100);

/// Lock parameters taken from the run configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockSettings {
    pub key: String,
    /// Keep trying while somebody else holds the key.
    pub retry: bool,
    pub retry_interval: Duration,
}

/// Outcome of [`LockManager::acquire`].
#[derive(Debug)]
pub enum Acquisition {
    /// We hold the lock until the guard is released.
    Acquired(LockGuard),
    /// Somebody else holds the lock and retry is disabled.
    Denied,
}

/// Wraps a [`LockStore`] into Acquire/Release semantics for one key.
///
/// Clones share the "held" flag, so whichever clone releases first deletes
/// the key and every later release through [`LockManager::release_if_held`]
/// is a no-op.
#[derive(Clone)]
pub struct LockManager {
    store: Arc<dyn LockStore>,
    settings: Arc<LockSettings>,
    held: Arc<AtomicBool>,
}

impl std::fmt::Debug for LockManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockManager")
            .field("settings", &self.settings)
            .field("held", &self.is_held())
            .finish_non_exhaustive()
    }
}

impl LockManager {
    pub fn new(store: Arc<dyn LockStore>, settings: LockSettings) -> Self {
        Self {
            store,
            settings: Arc::new(settings),
            held: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn key(&self) -> &str {
        &self.settings.key
    }

    pub fn settings(&self) -> &LockSettings {
        &self.settings
    }

    /// Whether this manager currently believes it holds the lock.
    pub fn is_held(&self) -> bool {
        self.held.load(Ordering::SeqCst)
    }

    /// Try to take the lock, retrying on contention when configured to.
    ///
    /// The retry loop has no upper bound and no backoff growth; it only ends
    /// when the key becomes free or the store fails.
    pub async fn acquire(&self) -> Result<Acquisition, StoreError> {
        let key = self.key();
        let value = lock_value();
        debug!(key, retry = self.settings.retry, "acquiring lock");

        let mut attempts: u64 = 0;
        loop {
            attempts += 1;
            match self.store.add(key, &value).await? {
                AddOutcome::Created => {
                    self.held.store(true, Ordering::SeqCst);
                    info!(key, attempts, "lock acquired");
                    return Ok(Acquisition::Acquired(LockGuard::new(self.clone())));
                }
                AddOutcome::AlreadyExists if !self.settings.retry => {
                    info!(key, "lock held by somebody else and retry is disabled");
                    return Ok(Acquisition::Denied);
                }
                AddOutcome::AlreadyExists => {
                    debug!(key, attempts, "lock contested; retrying");
                    tokio::time::sleep(self.settings.retry_interval).await;
                }
            }
        }
    }

    /// Delete the lock key. Best effort: failures are logged, never returned.
    ///
    /// Deleting a key that is already gone is fine.
    pub async fn release(&self) {
        let key = self.key();
        match self.store.delete(key).await {
            Ok(DeleteOutcome::Deleted) => info!(key, "lock released"),
            Ok(DeleteOutcome::NotFound) => debug!(key, "lock key already absent on release"),
            Err(err) => warn!(key, error = %err, "failed to release lock"),
        }
    }

    /// Release only if this manager (or a clone) still holds the lock.
    ///
    /// Returns whether a delete was issued. If the release is abandoned
    /// midway (the future is dropped or the store panics), the lock counts
    /// as held again so a later call retries the delete.
    pub async fn release_if_held(&self) -> bool {
        if !self.held.swap(false, Ordering::SeqCst) {
            return false;
        }

        let mut pending = PendingRelease {
            held: &self.held,
            finished: false,
        };
        self.release().await;
        pending.finished = true;
        true
    }
}

/// Restores the held flag unless the release ran to completion.
struct PendingRelease<'a> {
    held: &'a AtomicBool,
    finished: bool,
}

impl Drop for PendingRelease<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.held.store(true, Ordering::SeqCst);
        }
    }
}
