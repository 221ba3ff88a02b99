// tests/memcache_store.rs

use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use sherlock::lock::{Acquisition, LockManager, LockSettings};
use sherlock::store::{AddOutcome, DeleteOutcome, LockStore, MemcacheStore, StoreError};
use sherlock_test_utils::fake_memcached::{unused_endpoint, Behaviour, FakeMemcached};
use sherlock_test_utils::{init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

fn store_for(endpoints: Vec<String>) -> MemcacheStore {
    MemcacheStore::new(endpoints, Duration::from_millis(300))
}

#[tokio::test]
async fn add_is_create_if_absent_on_the_wire() -> TestResult {
    init_tracing();
    let server = FakeMemcached::start().await;
    let store = store_for(vec![server.endpoint()]);

    assert_eq!(store.add("wire-lock", b"HI").await?, AddOutcome::Created);
    assert_eq!(store.add("wire-lock", b"HO").await?, AddOutcome::AlreadyExists);
    assert_eq!(server.get("wire-lock"), Some(b"HI".to_vec()));
    Ok(())
}

#[tokio::test]
async fn delete_reports_missing_keys() -> TestResult {
    init_tracing();
    let server = FakeMemcached::start().await;
    let store = store_for(vec![server.endpoint()]);

    server.insert("wire-lock", b"held");
    assert_eq!(store.delete("wire-lock").await?, DeleteOutcome::Deleted);
    assert_eq!(store.delete("wire-lock").await?, DeleteOutcome::NotFound);
    assert!(!server.contains("wire-lock"));
    Ok(())
}

#[tokio::test]
async fn server_errors_are_reported_with_context() {
    init_tracing();
    let server = FakeMemcached::start_with(Behaviour::ServerError).await;
    let store = store_for(vec![server.endpoint()]);

    match store.add("k", b"v").await {
        Err(StoreError::Server { op, message, .. }) => {
            assert_eq!(op, "add");
            assert!(message.contains("out of memory"));
        }
        other => panic!("expected server error, got {other:?}"),
    }
}

#[tokio::test]
async fn unexpected_replies_are_protocol_errors() {
    init_tracing();
    let server = FakeMemcached::start_with(Behaviour::Garbage).await;
    let store = store_for(vec![server.endpoint()]);

    assert!(matches!(
        store.delete("k").await,
        Err(StoreError::Protocol { op: "delete", .. })
    ));
}

#[tokio::test]
async fn non_utf8_replies_are_protocol_errors() {
    init_tracing();
    let server = FakeMemcached::start_with(Behaviour::NotUtf8).await;
    let store = store_for(vec![server.endpoint()]);

    assert!(matches!(
        store.add("k", b"v").await,
        Err(StoreError::Protocol { op: "add", .. })
    ));
}

#[tokio::test]
async fn silent_server_times_out() {
    init_tracing();
    let server = FakeMemcached::start_with(Behaviour::Silent).await;
    let store = MemcacheStore::new(vec![server.endpoint()], Duration::from_millis(100));

    let result = with_timeout(store.add("k", b"v")).await;
    assert!(matches!(result, Err(StoreError::Timeout { op: "add", .. })));
}

#[tokio::test]
async fn unreachable_server_is_a_connect_error() {
    init_tracing();
    let endpoint = unused_endpoint().await;
    let store = store_for(vec![endpoint.clone()]);

    match store.add("k", b"v").await {
        Err(StoreError::Connect { server, .. }) => assert_eq!(server, endpoint),
        other => panic!("expected connect error, got {other:?}"),
    }
}

#[tokio::test]
async fn illegal_keys_never_reach_the_server() {
    init_tracing();
    let server = FakeMemcached::start().await;
    let store = store_for(vec![server.endpoint()]);

    assert!(matches!(
        store.add("two words", b"v").await,
        Err(StoreError::InvalidKey(_))
    ));
}

#[tokio::test]
async fn hosts_sharing_a_server_list_contend_on_the_same_server() -> TestResult {
    init_tracing();
    let a = FakeMemcached::start().await;
    let b = FakeMemcached::start().await;
    let endpoints = vec![a.endpoint(), b.endpoint()];

    let host1 = store_for(endpoints.clone());
    let host2 = store_for(endpoints);

    assert_eq!(host1.add("shared", b"1").await?, AddOutcome::Created);
    assert_eq!(host2.add("shared", b"2").await?, AddOutcome::AlreadyExists);
    assert!(a.contains("shared") ^ b.contains("shared"));
    Ok(())
}

#[tokio::test]
async fn exactly_one_of_many_acquirers_wins_over_the_wire() -> TestResult {
    init_tracing();
    let server = FakeMemcached::start().await;
    let settings = LockSettings {
        key: "race".to_string(),
        retry: false,
        retry_interval: Duration::from_millis(100),
    };

    let mut handles = Vec::new();
    for _ in 0..8 {
        let store: Arc<dyn LockStore> = Arc::new(store_for(vec![server.endpoint()]));
        let manager = LockManager::new(store, settings.clone());
        handles.push(tokio::spawn(async move {
            matches!(manager.acquire().await, Ok(Acquisition::Acquired(_)))
        }));
    }

    let mut winners = 0;
    for handle in handles {
        if handle.await? {
            winners += 1;
        }
    }
    assert_eq!(winners, 1);
    Ok(())
}
