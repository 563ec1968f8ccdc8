//! Lifecycle manager: one-time bootstrap of the shared database.
//!
//! ```text
//! Uninitialized ──initialize()──► Initializing ──► Ready
//!        ▲                             │
//!        └──── persist / open error ───┤
//!                                      └──► Failed (engine error)
//! ```
//!
//! Bootstrap runs as a single shared future. Every caller that arrives
//! while it is in flight awaits the same future and receives the same
//! `Arc<Database>` or the same error.

use crate::config::{BackendPolicy, Config};
use crate::coordinator::DurabilityCoordinator;
use crate::database::{Database, Origin};
use crate::error::{CoreError, CoreResult};
use crate::stats::{LifecycleStats, StatsSnapshot};
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use rusqlite::Connection;
use snapsql_codec::Snapshot;
use snapsql_storage::{KvStore, StoreBackend};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Observable state of a [`LifecycleManager`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// No bootstrap has run, or the last one failed recoverably.
    Uninitialized,
    /// A bootstrap is in flight.
    Initializing,
    /// The database is available.
    Ready,
    /// The engine could not start; every call fails.
    Failed,
}

struct Ready<B: StoreBackend> {
    db: Arc<Database>,
    coordinator: Arc<DurabilityCoordinator<B>>,
}

impl<B: StoreBackend> Clone for Ready<B> {
    fn clone(&self) -> Self {
        Self {
            db: Arc::clone(&self.db),
            coordinator: Arc::clone(&self.coordinator),
        }
    }
}

type Bootstrap<B> = Shared<BoxFuture<'static, CoreResult<Ready<B>>>>;

enum Slot<B: StoreBackend> {
    Uninitialized,
    Initializing(Bootstrap<B>),
    Ready(Ready<B>),
    Failed(CoreError),
}

struct Inner<B: StoreBackend> {
    config: Config,
    store: Arc<KvStore<B>>,
    slot: Mutex<Slot<B>>,
    stats: Arc<LifecycleStats>,
}

/// Owns the single database instance for one store.
///
/// Cloning a manager yields another handle to the same state.
///
/// # Example
///
/// ```rust
/// use snapsql_core::{Config, LifecycleManager};
/// use snapsql_storage::InMemoryBackend;
///
/// # let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
/// # rt.block_on(async {
/// let manager = LifecycleManager::new(InMemoryBackend::new(), Config::default());
/// let db = manager.initialize().await.unwrap();
///
/// db.execute_batch("CREATE TABLE IF NOT EXISTS t (x INTEGER)").unwrap();
/// db.execute("INSERT INTO t VALUES (1)", []).unwrap();
/// manager.persist().await.unwrap();
/// # });
/// ```
pub struct LifecycleManager<B: StoreBackend> {
    inner: Arc<Inner<B>>,
}

impl<B: StoreBackend> Clone for LifecycleManager<B> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<B: StoreBackend> LifecycleManager<B> {
    /// Creates a manager. Nothing is started until [`initialize`](Self::initialize).
    pub fn new(backend: B, config: Config) -> Self {
        let store = Arc::new(KvStore::new(backend, config.store_spec()));
        Self {
            inner: Arc::new(Inner {
                config,
                store,
                slot: Mutex::new(Slot::Uninitialized),
                stats: Arc::new(LifecycleStats::new()),
            }),
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Returns the current state.
    pub fn state(&self) -> LifecycleState {
        match &*self.inner.slot.lock() {
            Slot::Uninitialized => LifecycleState::Uninitialized,
            Slot::Initializing(_) => LifecycleState::Initializing,
            Slot::Ready(_) => LifecycleState::Ready,
            Slot::Failed(_) => LifecycleState::Failed,
        }
    }

    /// Returns a copy of the lifecycle counters.
    pub fn stats(&self) -> StatsSnapshot {
        self.inner.stats.snapshot()
    }

    /// Bootstraps the database once and returns it.
    ///
    /// The first call starts the engine, opens the store and loads the
    /// stored snapshot. When nothing usable is stored, a fresh empty
    /// database is created and its first snapshot is written before this
    /// resolves. Concurrent callers share that one bootstrap; callers after
    /// it completes get the same handle immediately.
    ///
    /// # Errors
    ///
    /// - `EngineBootstrapFailed` if the engine cannot start. The manager
    ///   stays failed and every later call returns the same error.
    ///   The same applies when an intact stored snapshot cannot be replayed,
    ///   for example one written by a newer format; the record is kept.
    /// - `PersistFailed` if the first snapshot of a fresh database cannot be
    ///   written. The manager returns to `Uninitialized`.
    /// - `BackendUnavailable` if the store cannot be opened and the policy
    ///   is [`BackendPolicy::Fail`]. The manager returns to `Uninitialized`.
    pub async fn initialize(&self) -> CoreResult<Arc<Database>> {
        let bootstrap = {
            let mut slot = self.inner.slot.lock();
            match &*slot {
                Slot::Ready(ready) => return Ok(Arc::clone(&ready.db)),
                Slot::Failed(err) => return Err(err.clone()),
                Slot::Initializing(bootstrap) => {
                    debug!("joining in-flight bootstrap");
                    bootstrap.clone()
                }
                Slot::Uninitialized => {
                    let inner = Arc::clone(&self.inner);
                    let bootstrap = async move {
                        let result = inner.bootstrap().await;
                        inner.settle(&result);
                        result
                    }
                    .boxed()
                    .shared();
                    *slot = Slot::Initializing(bootstrap.clone());
                    bootstrap
                }
            }
        };

        bootstrap.await.map(|ready| ready.db)
    }

    /// Returns the database if bootstrap has completed.
    ///
    /// Never starts a bootstrap.
    ///
    /// # Errors
    ///
    /// Returns `NotInitialized` unless the manager is `Ready`.
    pub fn get(&self) -> CoreResult<Arc<Database>> {
        self.ready().map(|ready| ready.db)
    }

    /// Returns the durability coordinator of the ready database.
    ///
    /// # Errors
    ///
    /// Returns `NotInitialized` unless the manager is `Ready`.
    pub fn coordinator(&self) -> CoreResult<Arc<DurabilityCoordinator<B>>> {
        self.ready().map(|ready| ready.coordinator)
    }

    /// Snapshots the database and writes it to the store.
    ///
    /// See [`DurabilityCoordinator::persist`].
    ///
    /// # Errors
    ///
    /// Returns `NotInitialized` before bootstrap, otherwise the persist
    /// error.
    pub async fn persist(&self) -> CoreResult<()> {
        self.coordinator()?.persist().await
    }

    /// Runs `f` against the connection, then persists.
    ///
    /// See [`DurabilityCoordinator::mutate`].
    ///
    /// # Errors
    ///
    /// Returns `NotInitialized` (converted) before bootstrap, otherwise the
    /// closure or persist error.
    pub async fn mutate<R, E, F>(&self, f: F) -> Result<R, E>
    where
        F: FnOnce(&mut Connection) -> Result<R, E>,
        E: From<CoreError>,
    {
        self.coordinator()?.mutate(f).await
    }

    fn ready(&self) -> CoreResult<Ready<B>> {
        match &*self.inner.slot.lock() {
            Slot::Ready(ready) => Ok(ready.clone()),
            _ => Err(CoreError::NotInitialized),
        }
    }
}

impl<B: StoreBackend> Inner<B> {
    async fn bootstrap(&self) -> CoreResult<Ready<B>> {
        info!(store = %self.config.store_name, "bootstrapping database");

        let fresh = self.start_engine().await?;

        let handle = match self.store.open().await {
            Ok(handle) => {
                self.stats.record_store_open();
                Some(handle)
            }
            Err(err) => match self.config.on_backend_unavailable {
                BackendPolicy::Fail => return Err(CoreError::from_open(&err)),
                BackendPolicy::Degrade => {
                    warn!(
                        store = %self.config.store_name,
                        error = %err,
                        "store unavailable, continuing with an unpersisted database"
                    );
                    None
                }
            },
        };

        let (conn, origin) = match &handle {
            None => (fresh, Origin::Detached),
            Some(handle) => match self.store.get(handle, &self.config.record_key).await {
                None => (fresh, Origin::Fresh),
                Some(bytes) => match snapsql_codec::decode(&Snapshot::from_bytes(bytes)) {
                    Ok(restored) => (restored, Origin::Restored),
                    Err(err) if err.is_corruption() => {
                        warn!(
                            key = %self.config.record_key,
                            error = %err,
                            "stored snapshot unreadable, starting fresh"
                        );
                        (fresh, Origin::Recovered)
                    }
                    Err(err) => {
                        return Err(CoreError::engine_bootstrap_failed(format!(
                            "replaying stored snapshot: {err}"
                        )))
                    }
                },
            },
        };

        match origin {
            Origin::Restored => self.stats.record_snapshot_loaded(),
            _ => self.stats.record_fresh_database(),
        }

        let db = Arc::new(Database::new(conn, origin));
        let coordinator = Arc::new(DurabilityCoordinator::new(
            Arc::clone(&db),
            Arc::clone(&self.store),
            self.config.record_key.clone(),
            handle,
            Arc::clone(&self.stats),
        ));

        if matches!(origin, Origin::Fresh | Origin::Recovered) {
            coordinator.persist().await?;
        }

        Ok(Ready { db, coordinator })
    }

    async fn start_engine(&self) -> CoreResult<Connection> {
        let required = self.config.min_engine_version;
        let conn = tokio::task::spawn_blocking(move || {
            let found = rusqlite::version_number();
            if found < required {
                return Err(CoreError::engine_bootstrap_failed(format!(
                    "sqlite {} is older than required {required}",
                    rusqlite::version()
                )));
            }
            Connection::open_in_memory()
                .map_err(|e| CoreError::engine_bootstrap_failed(e.to_string()))
        })
        .await
        .map_err(|e| CoreError::engine_bootstrap_failed(e.to_string()))??;

        self.stats.record_engine_start();
        debug!(version = rusqlite::version(), "engine started");
        Ok(conn)
    }

    fn settle(&self, result: &CoreResult<Ready<B>>) {
        let mut slot = self.slot.lock();
        *slot = match result {
            Ok(ready) => {
                info!(origin = ?ready.db.origin(), "database ready");
                Slot::Ready(ready.clone())
            }
            Err(err) if err.is_terminal() => {
                warn!(error = %err, "bootstrap failed permanently");
                Slot::Failed(err.clone())
            }
            Err(err) => {
                warn!(error = %err, "bootstrap failed, will retry on next initialize");
                Slot::Uninitialized
            }
        };
    }
}
