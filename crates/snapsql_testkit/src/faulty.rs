//! Fault-injecting backend wrapper.

use async_trait::async_trait;
use bytes::Bytes;
use snapsql_storage::{StorageError, StorageResult, StoreBackend, StoreHandle, StoreSpec};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Debug, Default)]
struct Faults {
    fail_open: AtomicBool,
    fail_get: AtomicBool,
    fail_put: AtomicBool,
    opens: AtomicU64,
    gets: AtomicU64,
    puts: AtomicU64,
}

/// Wraps a backend and fails operations on demand.
///
/// Clones share their switches, so a test can keep one clone while the
/// manager owns another:
///
/// ```rust
/// use snapsql_storage::InMemoryBackend;
/// use snapsql_testkit::FaultyBackend;
///
/// let backend = FaultyBackend::new(InMemoryBackend::new());
/// let switch = backend.clone();
/// switch.fail_put(true);
/// ```
#[derive(Debug, Clone)]
pub struct FaultyBackend<B> {
    inner: B,
    faults: Arc<Faults>,
}

impl<B: StoreBackend> FaultyBackend<B> {
    /// Wraps `inner` with every fault switched off.
    pub fn new(inner: B) -> Self {
        Self {
            inner,
            faults: Arc::new(Faults::default()),
        }
    }

    /// Returns the wrapped backend.
    pub fn inner(&self) -> &B {
        &self.inner
    }

    /// Makes `open` fail while set.
    pub fn fail_open(&self, on: bool) {
        self.faults.fail_open.store(on, Ordering::SeqCst);
    }

    /// Makes `get` fail while set.
    pub fn fail_get(&self, on: bool) {
        self.faults.fail_get.store(on, Ordering::SeqCst);
    }

    /// Makes `put` fail while set.
    pub fn fail_put(&self, on: bool) {
        self.faults.fail_put.store(on, Ordering::SeqCst);
    }

    /// Number of `open` calls attempted, failed or not.
    pub fn open_calls(&self) -> u64 {
        self.faults.opens.load(Ordering::SeqCst)
    }

    /// Number of `get` calls attempted, failed or not.
    pub fn get_calls(&self) -> u64 {
        self.faults.gets.load(Ordering::SeqCst)
    }

    /// Number of `put` calls attempted, failed or not.
    pub fn put_calls(&self) -> u64 {
        self.faults.puts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<B: StoreBackend> StoreBackend for FaultyBackend<B> {
    type Handle = FaultyHandle<B::Handle>;

    async fn open(&self, spec: &StoreSpec) -> StorageResult<Self::Handle> {
        self.faults.opens.fetch_add(1, Ordering::SeqCst);
        if self.faults.fail_open.load(Ordering::SeqCst) {
            return Err(StorageError::unavailable("injected open failure"));
        }
        let inner = self.inner.open(spec).await?;
        Ok(FaultyHandle {
            inner,
            faults: Arc::clone(&self.faults),
        })
    }
}

/// Handle produced by [`FaultyBackend`].
#[derive(Debug)]
pub struct FaultyHandle<H> {
    inner: H,
    faults: Arc<Faults>,
}

#[async_trait]
impl<H: StoreHandle> StoreHandle for FaultyHandle<H> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn version(&self) -> u32 {
        self.inner.version()
    }

    fn upgraded_from(&self) -> Option<u32> {
        self.inner.upgraded_from()
    }

    async fn get(&self, namespace: &str, key: &str) -> StorageResult<Option<Bytes>> {
        self.faults.gets.fetch_add(1, Ordering::SeqCst);
        if self.faults.fail_get.load(Ordering::SeqCst) {
            return Err(StorageError::injected("get"));
        }
        self.inner.get(namespace, key).await
    }

    async fn put(&self, namespace: &str, key: &str, value: Bytes) -> StorageResult<()> {
        self.faults.puts.fetch_add(1, Ordering::SeqCst);
        if self.faults.fail_put.load(Ordering::SeqCst) {
            return Err(StorageError::injected("put"));
        }
        self.inner.put(namespace, key, value).await
    }
}
