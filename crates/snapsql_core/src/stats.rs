//! Lifecycle and persistence counters.
//!
//! # Usage
//!
//! ```rust,ignore
//! let manager = LifecycleManager::new(InMemoryBackend::new(), Config::default());
//! manager.initialize().await?;
//!
//! let stats = manager.stats();
//! println!("Fresh databases: {}", stats.fresh_databases);
//! println!("Persists written: {}", stats.persists_written);
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters shared by a manager and its coordinator.
///
/// All counters are atomic and monotonically increasing.
#[derive(Debug, Default)]
pub struct LifecycleStats {
    engine_starts: AtomicU64,
    store_opens: AtomicU64,
    snapshots_loaded: AtomicU64,
    fresh_databases: AtomicU64,
    persists_written: AtomicU64,
    persists_coalesced: AtomicU64,
    persist_failures: AtomicU64,
    bytes_written: AtomicU64,
}

impl LifecycleStats {
    /// Creates a new stats instance.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_engine_start(&self) {
        self.engine_starts.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_store_open(&self) {
        self.store_opens.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_snapshot_loaded(&self) {
        self.snapshots_loaded.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_fresh_database(&self) {
        self.fresh_databases.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_persist_written(&self, bytes: u64) {
        self.persists_written.fetch_add(1, Ordering::Relaxed);
        self.bytes_written.fetch_add(bytes, Ordering::Relaxed);
    }

    pub(crate) fn record_persist_coalesced(&self) {
        self.persists_coalesced.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_persist_failure(&self) {
        self.persist_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns a point-in-time copy of every counter.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            engine_starts: self.engine_starts.load(Ordering::Relaxed),
            store_opens: self.store_opens.load(Ordering::Relaxed),
            snapshots_loaded: self.snapshots_loaded.load(Ordering::Relaxed),
            fresh_databases: self.fresh_databases.load(Ordering::Relaxed),
            persists_written: self.persists_written.load(Ordering::Relaxed),
            persists_coalesced: self.persists_coalesced.load(Ordering::Relaxed),
            persist_failures: self.persist_failures.load(Ordering::Relaxed),
            bytes_written: self.bytes_written.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time copy of [`LifecycleStats`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    /// Times the embedded engine was started.
    pub engine_starts: u64,
    /// Successful store opens, including reopen attempts after degrade.
    pub store_opens: u64,
    /// Bootstraps that restored a stored snapshot.
    pub snapshots_loaded: u64,
    /// Bootstraps that created an empty database.
    pub fresh_databases: u64,
    /// Snapshots written to the store.
    pub persists_written: u64,
    /// Persist calls satisfied by a write that already covered them.
    pub persists_coalesced: u64,
    /// Persist calls that returned an error.
    pub persist_failures: u64,
    /// Total snapshot bytes written.
    pub bytes_written: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate() {
        let stats = LifecycleStats::new();
        stats.record_engine_start();
        stats.record_persist_written(100);
        stats.record_persist_written(50);
        stats.record_persist_coalesced();
        stats.record_persist_failure();

        let snap = stats.snapshot();
        assert_eq!(snap.engine_starts, 1);
        assert_eq!(snap.persists_written, 2);
        assert_eq!(snap.bytes_written, 150);
        assert_eq!(snap.persists_coalesced, 1);
        assert_eq!(snap.persist_failures, 1);
        assert_eq!(snap.store_opens, 0);
    }

    #[test]
    fn snapshot_is_detached() {
        let stats = LifecycleStats::new();
        let before = stats.snapshot();
        stats.record_fresh_database();
        assert_eq!(before, StatsSnapshot::default());
        assert_eq!(stats.snapshot().fresh_databases, 1);
    }
}
