//! Persist ordering, coalescing and failure propagation.

use snapsql_codec::Snapshot;
use snapsql_core::{Config, CoreError, InMemoryBackend, LifecycleManager};
use snapsql_testkit::{count_rows, memory_manager, FaultyBackend, ReactionError, ReactionTimes};

const STORE: &str = "my-sqlite-db";
const NAMESPACE: &str = "sqlite-files";
const KEY: &str = "sqlite-export";

fn stored(backend: &InMemoryBackend) -> rusqlite::Connection {
    let bytes = backend.peek(STORE, NAMESPACE, KEY).unwrap();
    snapsql_codec::decode(&Snapshot::from_bytes(bytes)).unwrap()
}

#[tokio::test]
async fn record_reflects_last_awaited_mutation() {
    let (backend, manager) = memory_manager();
    let db = manager.initialize().await.unwrap();
    db.execute_batch("CREATE TABLE t (x INTEGER)").unwrap();

    for i in 0..5i64 {
        db.execute("INSERT INTO t VALUES (?1)", [i]).unwrap();
        manager.persist().await.unwrap();

        let max: i64 = stored(&backend)
            .query_row("SELECT max(x) FROM t", [], |r| r.get(0))
            .unwrap();
        assert_eq!(max, i);
    }
}

#[tokio::test]
async fn unawaited_back_to_back_writes_both_survive() {
    let (backend, manager) = memory_manager();
    let tests = ReactionTimes::new(manager.clone());
    tests.ensure_schema().await.unwrap();

    let first = tests.add_test("one", 0, 120, 120);
    let second = tests.add_test("two", 0, 95, 95);
    let (a, b) = futures::join!(first, second);
    a.unwrap();
    b.unwrap();

    let conn = stored(&backend);
    assert_eq!(count_rows(&conn, "reaction_times"), 2);

    let stats = manager.stats();
    assert_eq!(stats.persist_failures, 0);
    assert!(stats.persists_written >= 2);
}

#[tokio::test]
async fn many_overlapping_persists_coalesce() {
    let (backend, manager) = memory_manager();
    let db = manager.initialize().await.unwrap();
    db.execute_batch("CREATE TABLE t (x INTEGER)").unwrap();

    let writers = (0..10).map(|i| {
        let manager = manager.clone();
        let db = db.clone();
        async move {
            db.execute("INSERT INTO t VALUES (?1)", [i]).unwrap();
            manager.persist().await
        }
    });
    for result in futures::future::join_all(writers).await {
        result.unwrap();
    }

    assert_eq!(count_rows(&stored(&backend), "t"), 10);
    let stats = manager.stats();
    assert!(stats.persists_coalesced > 0);
    // One write during bootstrap plus the ones the overlapping callers shared.
    assert_eq!(stats.persists_written + stats.persists_coalesced, 11);
}

#[tokio::test]
async fn put_failure_surfaces_and_keeps_mutation() {
    let backend = FaultyBackend::new(InMemoryBackend::new());
    let tests = ReactionTimes::new(LifecycleManager::new(backend.clone(), Config::default()));
    tests.ensure_schema().await.unwrap();

    backend.fail_put(true);
    let err = tests.add_test("lost?", 0, 300, 300).await.unwrap_err();
    assert!(matches!(
        err,
        ReactionError::Core(CoreError::PersistFailed { .. })
    ));

    // Still visible in memory.
    assert_eq!(tests.all_tests().unwrap().len(), 1);

    // Nothing durable carries the row yet.
    let inner = backend.inner();
    let bytes = inner.peek(STORE, NAMESPACE, KEY).unwrap();
    let conn = snapsql_codec::decode(&Snapshot::from_bytes(bytes)).unwrap();
    let has_table: bool = conn
        .query_row(
            "SELECT EXISTS (SELECT 1 FROM sqlite_master WHERE name = 'reaction_times')",
            [],
            |r| r.get(0),
        )
        .unwrap();
    assert!(!has_table);

    backend.fail_put(false);
    tests.manager().persist().await.unwrap();
    assert_eq!(count_rows(&stored(inner), "reaction_times"), 1);
    assert_eq!(tests.manager().stats().persist_failures, 1);
}

#[tokio::test]
async fn get_failure_is_treated_as_absent() {
    let healthy = InMemoryBackend::new();
    {
        let manager = LifecycleManager::new(healthy.clone(), Config::default());
        let db = manager.initialize().await.unwrap();
        db.execute_batch("CREATE TABLE t (x); INSERT INTO t VALUES (1);")
            .unwrap();
        manager.persist().await.unwrap();
    }

    let backend = FaultyBackend::new(healthy.clone());
    backend.fail_get(true);
    let manager = LifecycleManager::new(backend.clone(), Config::default());
    let db = manager.initialize().await.unwrap();

    assert!(db.origin().is_fresh());
    let tables: i64 = db
        .with_conn(|c| c.query_row("SELECT count(*) FROM sqlite_master", [], |r| r.get(0)))
        .unwrap();
    assert_eq!(tables, 0);
    assert_eq!(backend.get_calls(), 1);
}

#[tokio::test]
async fn persist_inside_open_transaction_fails_cleanly() {
    let (backend, manager) = memory_manager();
    let db = manager.initialize().await.unwrap();
    db.execute_batch("CREATE TABLE t (x); BEGIN; INSERT INTO t VALUES (1);")
        .unwrap();

    let err = manager.persist().await.unwrap_err();
    assert!(matches!(err, CoreError::PersistFailed { .. }));
    let conn = stored(&backend);
    let tables: i64 = conn
        .query_row("SELECT count(*) FROM sqlite_master", [], |r| r.get(0))
        .unwrap();
    assert_eq!(tables, 0);

    db.execute_batch("COMMIT").unwrap();
    manager.persist().await.unwrap();
    assert_eq!(count_rows(&stored(&backend), "t"), 1);
}
