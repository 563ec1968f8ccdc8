//! In-memory backend for testing.

use crate::backend::{StoreBackend, StoreHandle, StoreSpec};
use crate::error::{StorageError, StorageResult};
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Operation counters kept by [`InMemoryBackend`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackendCounters {
    /// Successful opens.
    pub opens: u64,
    /// Upgrades run.
    pub upgrades: u64,
    /// Reads issued.
    pub gets: u64,
    /// Writes committed.
    pub puts: u64,
}

#[derive(Debug, Default)]
struct MemoryStore {
    version: u32,
    namespaces: HashMap<String, HashMap<String, Bytes>>,
}

#[derive(Debug, Default)]
struct MemoryState {
    stores: HashMap<String, MemoryStore>,
    counters: BackendCounters,
}

/// An in-memory backend.
///
/// This backend keeps all stores in memory and is suitable for:
/// - Unit tests
/// - Integration tests (clones share state, so a second "process" can
///   reopen what the first one wrote)
/// - Ephemeral databases that don't need persistence
///
/// Every operation yields to the scheduler once before it takes effect,
/// so concurrent callers interleave the way they would against a real
/// asynchronous backend.
///
/// # Example
///
/// ```rust
/// use snapsql_storage::{InMemoryBackend, StoreBackend, StoreHandle, StoreSpec};
///
/// # let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
/// # rt.block_on(async {
/// let backend = InMemoryBackend::new();
/// let handle = backend.open(&StoreSpec::new("db", 1, "files")).await.unwrap();
/// assert_eq!(handle.upgraded_from(), Some(0));
/// assert_eq!(backend.counters().upgrades, 1);
/// # });
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemoryBackend {
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryBackend {
    /// Creates a new empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the operation counters.
    #[must_use]
    pub fn counters(&self) -> BackendCounters {
        self.state.lock().counters
    }

    /// Returns the recorded version of a store, if it exists.
    #[must_use]
    pub fn store_version(&self, name: &str) -> Option<u32> {
        self.state.lock().stores.get(name).map(|s| s.version)
    }

    /// Reads a record directly, bypassing handles and counters.
    ///
    /// Useful for asserting on what a test run left behind.
    #[must_use]
    pub fn peek(&self, name: &str, namespace: &str, key: &str) -> Option<Bytes> {
        let state = self.state.lock();
        state
            .stores
            .get(name)?
            .namespaces
            .get(namespace)?
            .get(key)
            .cloned()
    }

    /// Overwrites a record directly, bypassing handles and counters.
    ///
    /// Creates the store and namespace if needed. Useful for seeding a
    /// backend with a damaged record.
    pub fn poke(&self, name: &str, version: u32, namespace: &str, key: &str, value: Bytes) {
        let mut state = self.state.lock();
        let store = state.stores.entry(name.to_string()).or_default();
        store.version = store.version.max(version);
        store
            .namespaces
            .entry(namespace.to_string())
            .or_default()
            .insert(key.to_string(), value);
    }
}

#[async_trait]
impl StoreBackend for InMemoryBackend {
    type Handle = MemoryHandle;

    async fn open(&self, spec: &StoreSpec) -> StorageResult<MemoryHandle> {
        tokio::task::yield_now().await;

        let mut state = self.state.lock();
        let store = state.stores.entry(spec.name.clone()).or_default();

        if store.version > spec.version {
            return Err(StorageError::VersionDowngrade {
                stored: store.version,
                requested: spec.version,
            });
        }

        let upgraded_from = if store.version < spec.version {
            let old = store.version;
            for namespace in &spec.namespaces {
                store.namespaces.entry(namespace.clone()).or_default();
            }
            store.version = spec.version;
            Some(old)
        } else {
            None
        };

        if upgraded_from.is_some() {
            state.counters.upgrades += 1;
        }
        state.counters.opens += 1;

        Ok(MemoryHandle {
            name: spec.name.clone(),
            version: spec.version,
            upgraded_from,
            state: Arc::clone(&self.state),
        })
    }
}

/// Handle to a store inside an [`InMemoryBackend`].
#[derive(Debug, Clone)]
pub struct MemoryHandle {
    name: String,
    version: u32,
    upgraded_from: Option<u32>,
    state: Arc<Mutex<MemoryState>>,
}

#[async_trait]
impl StoreHandle for MemoryHandle {
    fn name(&self) -> &str {
        &self.name
    }

    fn version(&self) -> u32 {
        self.version
    }

    fn upgraded_from(&self) -> Option<u32> {
        self.upgraded_from
    }

    async fn get(&self, namespace: &str, key: &str) -> StorageResult<Option<Bytes>> {
        tokio::task::yield_now().await;

        let mut state = self.state.lock();
        state.counters.gets += 1;
        let records = state
            .stores
            .get(&self.name)
            .and_then(|s| s.namespaces.get(namespace))
            .ok_or_else(|| StorageError::MissingNamespace(namespace.to_string()))?;
        Ok(records.get(key).cloned())
    }

    async fn put(&self, namespace: &str, key: &str, value: Bytes) -> StorageResult<()> {
        tokio::task::yield_now().await;

        let mut state = self.state.lock();
        let records = state
            .stores
            .get_mut(&self.name)
            .and_then(|s| s.namespaces.get_mut(namespace))
            .ok_or_else(|| StorageError::MissingNamespace(namespace.to_string()))?;
        records.insert(key.to_string(), value);
        state.counters.puts += 1;
        Ok(())
    }
}
