// src/store/memory.rs

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::{AddOutcome, DeleteOutcome, LockStore, StoreFuture, validate_key};

/// Process-local store with the same atomic add/delete semantics as
/// memcached. Clones share the same map, so several lock managers built
/// from clones contend on the same keys.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    items: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.items().contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.items().get(key).cloned()
    }

    /// Seed a key directly, as if another host held the lock.
    pub fn insert(&self, key: &str, value: impl Into<Vec<u8>>) {
        self.items().insert(key.to_string(), value.into());
    }

    pub fn remove(&self, key: &str) -> bool {
        self.items().remove(key).is_some()
    }

    fn items(&self) -> MutexGuard<'_, HashMap<String, Vec<u8>>> {
        self.items.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl LockStore for InMemoryStore {
    fn add<'a>(&'a self, key: &'a str, value: &'a [u8]) -> StoreFuture<'a, AddOutcome> {
        Box::pin(async move {
            validate_key(key)?;
            let mut items = self.items();
            if items.contains_key(key) {
                return Ok(AddOutcome::AlreadyExists);
            }
            items.insert(key.to_string(), value.to_vec());
            Ok(AddOutcome::Created)
        })
    }

    fn delete<'a>(&'a self, key: &'a str) -> StoreFuture<'a, DeleteOutcome> {
        Box::pin(async move {
            validate_key(key)?;
            Ok(if self.remove(key) {
                DeleteOutcome::Deleted
            } else {
                DeleteOutcome::NotFound
            })
        })
    }
}
