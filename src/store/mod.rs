// src/store/mod.rs

//! Shared-store abstraction used as the mutual-exclusion primitive.
//!
//! The lock only needs two operations from the store:
//! - an atomic create-if-absent (`add`), whose success means "lock taken"
//! - a `delete`, used to give the lock back
//!
//! - [`memcache`] talks the memcached text protocol to real servers.
//! - [`protocol`] holds the pure request encoding / response parsing.
//! - [`memory`] is a process-local store with the same atomic semantics,
//!   used by tests and fakes.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use thiserror::Error;

pub mod memcache;
pub mod memory;
pub mod protocol;

pub use memcache::MemcacheStore;
pub use memory::InMemoryStore;

/// Longest key memcached accepts.
pub const MAX_KEY_LEN: usize = 250;

/// Boxed future returned by [`LockStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + Send + 'a>>;

/// Result of an atomic create-if-absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// The key did not exist and now holds our value.
    Created,
    /// Somebody else already holds the key.
    AlreadyExists,
}

/// Result of deleting a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    NotFound,
}

/// Transport or backend failure talking to the shared store.
///
/// A key that already exists is **not** an error; it is reported as
/// [`AddOutcome::AlreadyExists`].
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("no store servers configured")]
    NoServers,

    #[error("invalid key {0:?}: must be 1-250 bytes without whitespace or control characters")]
    InvalidKey(String),

    #[error("connecting to {server}: {source}")]
    Connect {
        server: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{op} on {server}: {source}")]
    Io {
        server: String,
        op: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("{op} on {server} timed out after {timeout:?}")]
    Timeout {
        server: String,
        op: &'static str,
        timeout: Duration,
    },

    #[error("{op} on {server} rejected by server: {message}")]
    Server {
        server: String,
        op: &'static str,
        message: String,
    },

    #[error("{op} on {server}: unexpected response {response:?}")]
    Protocol {
        server: String,
        op: &'static str,
        response: String,
    },
}

/// Minimal key-value interface the lock manager needs.
///
/// Production code uses [`MemcacheStore`]; tests can use [`InMemoryStore`]
/// or their own implementation that injects failures.
pub trait LockStore: Send + Sync {
    /// Store `value` under `key` only if `key` is absent. Atomic.
    fn add<'a>(&'a self, key: &'a str, value: &'a [u8]) -> StoreFuture<'a, AddOutcome>;

    /// Remove `key`. Deleting an absent key reports [`DeleteOutcome::NotFound`].
    fn delete<'a>(&'a self, key: &'a str) -> StoreFuture<'a, DeleteOutcome>;
}

/// Check a key against memcached's rules.
pub fn validate_key(key: &str) -> Result<(), StoreError> {
    let legal = !key.is_empty()
        && key.len() <= MAX_KEY_LEN
        && key.bytes().all(|b| b > b' ' && b != 0x7f);
    if legal {
        Ok(())
    } else {
        Err(StoreError::InvalidKey(key.to_string()))
    }
}

/// Value written under the lock key.
///
/// Only existence matters for locking; the payload names the holder so an
/// operator inspecting a stuck key can tell who took it.
pub fn lock_value() -> Vec<u8> {
    let host = nix::unistd::gethostname()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "unknown".to_string());
    let since_epoch = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    format!("{host}:{}:{since_epoch}", std::process::id()).into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_keys() {
        assert!(validate_key("mutex-default").is_ok());
        assert!(validate_key(&"k".repeat(MAX_KEY_LEN)).is_ok());
    }

    #[test]
    fn rejects_illegal_keys() {
        for bad in ["", "has space", "tab\there", "new\nline", "del\x7f"] {
            assert!(
                matches!(validate_key(bad), Err(StoreError::InvalidKey(_))),
                "{bad:?} should be rejected"
            );
        }
        assert!(validate_key(&"k".repeat(MAX_KEY_LEN + 1)).is_err());
    }

    #[test]
    fn lock_value_names_this_process() {
        let value = String::from_utf8(lock_value()).unwrap();
        assert!(value.contains(&format!(":{}:", std::process::id())));
    }
}
