//! Durability coordinator.
//!
//! Every mutation is durably complete only once a snapshot taken after it
//! has been written to the store. The coordinator owns that write path:
//!
//! - One snapshot write is in flight at a time (the write gate)
//! - Each `persist` call takes a ticket when it starts; a write covers every
//!   ticket issued before its snapshot was encoded
//! - A caller whose ticket is already covered by a completed write returns
//!   without writing again, so overlapping requests coalesce and the latest
//!   state always wins

use crate::database::Database;
use crate::error::{CoreError, CoreResult};
use crate::stats::LifecycleStats;
use rusqlite::Connection;
use snapsql_storage::{KvStore, StoreBackend};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Serializes snapshot writes for one database.
pub struct DurabilityCoordinator<B: StoreBackend> {
    db: Arc<Database>,
    store: Arc<KvStore<B>>,
    record_key: String,
    /// Write gate. `None` until the store has been opened.
    gate: Mutex<Option<B::Handle>>,
    requested: AtomicU64,
    persisted_through: AtomicU64,
    stats: Arc<LifecycleStats>,
}

impl<B: StoreBackend> DurabilityCoordinator<B> {
    pub(crate) fn new(
        db: Arc<Database>,
        store: Arc<KvStore<B>>,
        record_key: String,
        handle: Option<B::Handle>,
        stats: Arc<LifecycleStats>,
    ) -> Self {
        Self {
            db,
            store,
            record_key,
            gate: Mutex::new(handle),
            requested: AtomicU64::new(0),
            persisted_through: AtomicU64::new(0),
            stats,
        }
    }

    /// The database this coordinator persists.
    pub fn database(&self) -> &Arc<Database> {
        &self.db
    }

    /// Returns true once the store is open.
    pub async fn is_attached(&self) -> bool {
        self.gate.lock().await.is_some()
    }

    /// Snapshots the database and writes it to the store.
    ///
    /// Resolves once a snapshot reflecting every mutation made before this
    /// call has been confirmed durable. A failed persist leaves the
    /// in-memory state untouched; the next persist writes it again.
    ///
    /// # Errors
    ///
    /// - `BackendUnavailable` if the store was never opened and reopening
    ///   still fails
    /// - `PersistFailed` if encoding or the write fails
    pub async fn persist(&self) -> CoreResult<()> {
        let ticket = self.requested.fetch_add(1, Ordering::SeqCst) + 1;
        let mut gate = self.gate.lock().await;

        if self.persisted_through.load(Ordering::SeqCst) >= ticket {
            self.stats.record_persist_coalesced();
            debug!(ticket, "persist coalesced");
            return Ok(());
        }

        let result = match gate.take() {
            Some(handle) => {
                let result = self.write(&handle).await;
                *gate = Some(handle);
                result
            }
            None => match self.store.open().await {
                Ok(handle) => {
                    self.stats.record_store_open();
                    debug!("store reattached");
                    let result = self.write(&handle).await;
                    *gate = Some(handle);
                    result
                }
                Err(err) => Err(CoreError::from_open(&err)),
            },
        };

        if let Err(err) = &result {
            self.stats.record_persist_failure();
            warn!(ticket, error = %err, "persist failed");
        }
        result
    }

    /// Runs `f` against the connection, then persists.
    ///
    /// The closure's own error type is returned; it must be able to carry
    /// a [`CoreError`] for the persist step. If `f` fails nothing is
    /// persisted.
    ///
    /// # Errors
    ///
    /// Returns the closure's error, or the persist error converted into it.
    pub async fn mutate<R, E, F>(&self, f: F) -> Result<R, E>
    where
        F: FnOnce(&mut Connection) -> Result<R, E>,
        E: From<CoreError>,
    {
        let out = self.db.with_conn_mut(f)?;
        self.persist().await?;
        Ok(out)
    }

    async fn write(&self, handle: &B::Handle) -> CoreResult<()> {
        // Tickets issued up to here belong to mutations the snapshot includes.
        let covered = self.requested.load(Ordering::SeqCst);
        let snapshot = self.db.snapshot().map_err(|e| CoreError::from_encode(&e))?;
        let len = snapshot.len();

        self.store
            .put(handle, &self.record_key, snapshot.into_bytes())
            .await
            .map_err(|e| CoreError::from_put(&e))?;

        self.persisted_through.fetch_max(covered, Ordering::SeqCst);
        self.stats.record_persist_written(len as u64);
        debug!(covered, bytes = len, "snapshot persisted");
        Ok(())
    }
}

impl<B: StoreBackend> std::fmt::Debug for DurabilityCoordinator<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DurabilityCoordinator")
            .field("record_key", &self.record_key)
            .field("requested", &self.requested.load(Ordering::Relaxed))
            .field(
                "persisted_through",
                &self.persisted_through.load(Ordering::Relaxed),
            )
            .finish_non_exhaustive()
    }
}
