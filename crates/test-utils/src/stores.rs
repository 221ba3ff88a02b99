use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use sherlock::store::{
    AddOutcome, DeleteOutcome, InMemoryStore, LockStore, StoreError, StoreFuture,
};

/// A store whose every call fails like an unreachable server.
#[derive(Debug, Default, Clone)]
pub struct FailingStore {
    calls: Arc<AtomicUsize>,
}

impl FailingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn refuse(&self) -> StoreError {
        self.calls.fetch_add(1, Ordering::SeqCst);
        StoreError::Connect {
            server: "127.0.0.1:1".to_string(),
            source: std::io::Error::from(std::io::ErrorKind::ConnectionRefused),
        }
    }
}

impl LockStore for FailingStore {
    fn add<'a>(&'a self, _key: &'a str, _value: &'a [u8]) -> StoreFuture<'a, AddOutcome> {
        let err = self.refuse();
        Box::pin(async move { Err(err) })
    }

    fn delete<'a>(&'a self, _key: &'a str) -> StoreFuture<'a, DeleteOutcome> {
        let err = self.refuse();
        Box::pin(async move { Err(err) })
    }
}

/// In-memory store that works for `add` but fails every `delete`.
#[derive(Debug, Default, Clone)]
pub struct NoDeleteStore {
    pub inner: InMemoryStore,
}

impl LockStore for NoDeleteStore {
    fn add<'a>(&'a self, key: &'a str, value: &'a [u8]) -> StoreFuture<'a, AddOutcome> {
        self.inner.add(key, value)
    }

    fn delete<'a>(&'a self, _key: &'a str) -> StoreFuture<'a, DeleteOutcome> {
        Box::pin(async move {
            Err(StoreError::Server {
                server: "fake".to_string(),
                op: "delete",
                message: "SERVER_ERROR busy".to_string(),
            })
        })
    }
}

/// Counts deletes while delegating to an in-memory store.
#[derive(Debug, Default, Clone)]
pub struct CountingStore {
    pub inner: InMemoryStore,
    deletes: Arc<AtomicUsize>,
}

impl CountingStore {
    pub fn deletes(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }
}

impl LockStore for CountingStore {
    fn add<'a>(&'a self, key: &'a str, value: &'a [u8]) -> StoreFuture<'a, AddOutcome> {
        self.inner.add(key, value)
    }

    fn delete<'a>(&'a self, key: &'a str) -> StoreFuture<'a, DeleteOutcome> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.inner.delete(key)
    }
}

/// In-memory store whose first `delete` panics; later deletes go through.
#[derive(Debug, Default, Clone)]
pub struct PanicOnFirstDeleteStore {
    pub inner: InMemoryStore,
    deletes: Arc<AtomicUsize>,
}

impl PanicOnFirstDeleteStore {
    pub fn deletes(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }
}

impl LockStore for PanicOnFirstDeleteStore {
    fn add<'a>(&'a self, key: &'a str, value: &'a [u8]) -> StoreFuture<'a, AddOutcome> {
        self.inner.add(key, value)
    }

    fn delete<'a>(&'a self, key: &'a str) -> StoreFuture<'a, DeleteOutcome> {
        let call = self.deletes.fetch_add(1, Ordering::SeqCst);
        Box::pin(async move {
            if call == 0 {
                panic!("store blew up while deleting {key}");
            }
            self.inner.delete(key).await
        })
    }
}
