//! Bootstrap behavior of the lifecycle manager.

use bytes::Bytes;
use futures::future::join_all;
use snapsql_core::{
    BackendPolicy, Config, CoreError, InMemoryBackend, LifecycleManager, LifecycleState, Origin,
};
use snapsql_testkit::{count_rows, memory_manager, memory_manager_with, FaultyBackend};
use std::sync::Arc;

const STORE: &str = "my-sqlite-db";
const NAMESPACE: &str = "sqlite-files";
const KEY: &str = "sqlite-export";

#[tokio::test]
async fn concurrent_initialize_yields_one_instance() {
    let (backend, manager) = memory_manager();

    let handles = join_all((0..8).map(|_| manager.initialize())).await;
    let first = handles[0].as_ref().unwrap();
    for handle in &handles {
        assert!(Arc::ptr_eq(first, handle.as_ref().unwrap()));
    }

    let stats = manager.stats();
    assert_eq!(stats.engine_starts, 1);
    assert_eq!(stats.store_opens, 1);
    assert_eq!(stats.fresh_databases, 1);
    assert_eq!(backend.counters().opens, 1);
    assert_eq!(backend.counters().upgrades, 1);
}

#[tokio::test]
async fn initialize_after_ready_is_immediate() {
    let (backend, manager) = memory_manager();
    let a = manager.initialize().await.unwrap();
    let before = backend.counters();

    let b = manager.initialize().await.unwrap();
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(backend.counters(), before);
}

#[tokio::test]
async fn get_never_bootstraps() {
    let (backend, manager) = memory_manager();
    assert_eq!(manager.get().unwrap_err(), CoreError::NotInitialized);
    assert_eq!(backend.counters().opens, 0);
    assert_eq!(manager.state(), LifecycleState::Uninitialized);
}

#[tokio::test]
async fn fresh_start_persists_before_returning() {
    let (backend, manager) = memory_manager();
    assert!(backend.peek(STORE, NAMESPACE, KEY).is_none());

    let db = manager.initialize().await.unwrap();
    assert_eq!(db.origin(), Origin::Fresh);

    let stored = backend.peek(STORE, NAMESPACE, KEY).unwrap();
    let summary = snapsql_codec::inspect(&stored).unwrap();
    assert!(summary.tables.is_empty());
    assert_eq!(manager.stats().persists_written, 1);
}

#[tokio::test]
async fn engine_failure_fails_every_waiter() {
    let (_, manager) =
        memory_manager_with(Config::new().min_engine_version(i32::MAX));

    let results = join_all((0..4).map(|_| manager.initialize())).await;
    for result in &results {
        assert!(matches!(
            result,
            Err(CoreError::EngineBootstrapFailed { .. })
        ));
    }
    assert_eq!(manager.state(), LifecycleState::Failed);

    let later = manager.initialize().await.unwrap_err();
    assert!(later.is_terminal());
    assert_eq!(manager.get().unwrap_err(), CoreError::NotInitialized);
}

#[tokio::test]
async fn initial_persist_failure_resets_to_uninitialized() {
    let backend = FaultyBackend::new(InMemoryBackend::new());
    let manager = LifecycleManager::new(backend.clone(), Config::default());

    backend.fail_put(true);
    let err = manager.initialize().await.unwrap_err();
    assert!(matches!(err, CoreError::PersistFailed { .. }));
    assert_eq!(manager.state(), LifecycleState::Uninitialized);

    backend.fail_put(false);
    let db = manager.initialize().await.unwrap();
    assert_eq!(db.origin(), Origin::Fresh);
    assert_eq!(manager.stats().engine_starts, 2);
    assert!(backend.inner().peek(STORE, NAMESPACE, KEY).is_some());
}

#[tokio::test]
async fn unavailable_store_degrades() {
    let backend = FaultyBackend::new(InMemoryBackend::new());
    let manager = LifecycleManager::new(backend.clone(), Config::default());

    backend.fail_open(true);
    let db = manager.initialize().await.unwrap();
    assert_eq!(db.origin(), Origin::Detached);
    assert_eq!(manager.state(), LifecycleState::Ready);

    db.execute_batch("CREATE TABLE t (x); INSERT INTO t VALUES (1);")
        .unwrap();
    let err = manager.persist().await.unwrap_err();
    assert!(matches!(err, CoreError::BackendUnavailable { .. }));

    // The store comes back: the next persist attaches and writes.
    backend.fail_open(false);
    manager.persist().await.unwrap();
    let stored = backend.inner().peek(STORE, NAMESPACE, KEY).unwrap();
    assert_eq!(snapsql_codec::inspect(&stored).unwrap().total_rows(), 1);
    assert!(manager.coordinator().unwrap().is_attached().await);
}

#[tokio::test]
async fn unavailable_store_with_fail_policy() {
    let backend = FaultyBackend::new(InMemoryBackend::new());
    let manager = LifecycleManager::new(
        backend.clone(),
        Config::new().on_backend_unavailable(BackendPolicy::Fail),
    );

    backend.fail_open(true);
    let err = manager.initialize().await.unwrap_err();
    assert!(matches!(err, CoreError::BackendUnavailable { .. }));
    assert_eq!(manager.state(), LifecycleState::Uninitialized);

    backend.fail_open(false);
    assert!(manager.initialize().await.is_ok());
}

#[tokio::test]
async fn corrupt_snapshot_is_replaced() {
    let backend = InMemoryBackend::new();
    backend.poke(
        STORE,
        1,
        NAMESPACE,
        KEY,
        Bytes::from_static(b"SQSN\x01\x00 this is not a real snapshot body at all"),
    );

    let manager = LifecycleManager::new(backend.clone(), Config::default());
    let db = manager.initialize().await.unwrap();
    assert_eq!(db.origin(), Origin::Recovered);

    let stored = backend.peek(STORE, NAMESPACE, KEY).unwrap();
    assert!(snapsql_codec::inspect(&stored).is_ok());
    assert_eq!(manager.stats().fresh_databases, 1);
}

#[tokio::test]
async fn newer_format_snapshot_is_left_untouched() {
    let backend = InMemoryBackend::new();
    let mut newer = b"SQSN".to_vec();
    newer.extend_from_slice(&(snapsql_codec::FORMAT_VERSION + 1).to_le_bytes());
    newer.extend_from_slice(&[0u8; 64]);
    let newer = Bytes::from(newer);
    backend.poke(STORE, 1, NAMESPACE, KEY, newer.clone());

    let manager = LifecycleManager::new(backend.clone(), Config::default());
    let err = manager.initialize().await.unwrap_err();
    assert!(matches!(err, CoreError::EngineBootstrapFailed { .. }));
    assert_eq!(manager.state(), LifecycleState::Failed);

    assert_eq!(backend.peek(STORE, NAMESPACE, KEY), Some(newer));
    assert_eq!(backend.counters().puts, 0);
    assert_eq!(manager.stats().fresh_databases, 0);
}

#[tokio::test]
async fn restored_database_is_not_rewritten() {
    let (backend, first) = memory_manager();
    let db = first.initialize().await.unwrap();
    db.execute_batch("CREATE TABLE t (x); INSERT INTO t VALUES (1), (2);")
        .unwrap();
    first.persist().await.unwrap();
    let puts = backend.counters().puts;

    let second = LifecycleManager::new(backend.clone(), Config::default());
    let db = second.initialize().await.unwrap();
    assert_eq!(db.origin(), Origin::Restored);
    assert_eq!(db.with_conn(|c| count_rows(c, "t")), 2);
    assert_eq!(backend.counters().puts, puts);
    assert_eq!(backend.counters().upgrades, 1);
}

#[tokio::test]
async fn store_version_bump_upgrades_once() {
    let (backend, first) = memory_manager();
    first.initialize().await.unwrap();

    let bumped = Config::new().store_version(2);
    let managers: Vec<_> = (0..3)
        .map(|_| LifecycleManager::new(backend.clone(), bumped.clone()))
        .collect();
    let results = join_all(managers.iter().map(|m| m.initialize())).await;
    for result in results {
        assert_eq!(result.unwrap().origin(), Origin::Restored);
    }

    assert_eq!(backend.store_version(STORE), Some(2));
    assert_eq!(backend.counters().upgrades, 2);
}
