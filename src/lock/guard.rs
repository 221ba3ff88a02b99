// src/lock/guard.rs

use tracing::warn;

use super::LockManager;

/// Proof that the lock is held.
///
/// Releasing needs a network round trip, so it cannot happen in `Drop`.
/// The coordinator releases the guard on every path it controls and falls
/// back to [`LockManager::release_if_held`] when its driver task panics.
#[must_use = "the lock stays held until the guard is released"]
#[derive(Debug)]
pub struct LockGuard {
    manager: LockManager,
}

impl LockGuard {
    pub(super) fn new(manager: LockManager) -> Self {
        Self { manager }
    }

    pub fn key(&self) -> &str {
        self.manager.key()
    }

    /// Give the lock back. Never fails; see [`LockManager::release`].
    pub async fn release(self) {
        self.manager.release_if_held().await;
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if self.manager.is_held() {
            warn!(
                key = self.manager.key(),
                "lock guard dropped while the lock is still held"
            );
        }
    }
}
