//! Key-value store adapter.
//!
//! [`KvStore`] binds a backend to one store and one namespace and applies
//! the read/write failure policy:
//!
//! - `open` and `put` errors propagate to the caller
//! - `get` errors are logged and reported as an absent record, so a lost or
//!   unreadable prior blob degrades to "nothing stored yet"

use crate::backend::{StoreBackend, StoreHandle, StoreSpec};
use crate::error::StorageResult;
use bytes::Bytes;

/// A backend bound to a single store namespace.
pub struct KvStore<B: StoreBackend> {
    backend: B,
    spec: StoreSpec,
    namespace: String,
}

impl<B: StoreBackend> KvStore<B> {
    /// Creates an adapter for the first namespace of `spec`.
    ///
    /// A spec without namespaces binds to the empty namespace, which no
    /// upgrade creates.
    pub fn new(backend: B, spec: StoreSpec) -> Self {
        let namespace = spec.namespaces.first().cloned().unwrap_or_default();
        Self {
            backend,
            spec,
            namespace,
        }
    }

    /// Returns the store spec.
    pub fn spec(&self) -> &StoreSpec {
        &self.spec
    }

    /// Returns the record namespace.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Returns the underlying backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Opens the store, running the upgrade on first open.
    ///
    /// # Errors
    ///
    /// Returns the backend error if the store cannot be opened.
    pub async fn open(&self) -> StorageResult<B::Handle> {
        let handle = self.backend.open(&self.spec).await?;
        match handle.upgraded_from() {
            Some(old) => tracing::info!(
                store = %self.spec.name,
                from = old,
                to = handle.version(),
                "store upgraded"
            ),
            None => tracing::debug!(store = %self.spec.name, version = handle.version(), "store opened"),
        }
        Ok(handle)
    }

    /// Reads the blob under `key`, treating any failure as absent.
    pub async fn get(&self, handle: &B::Handle, key: &str) -> Option<Bytes> {
        match handle.get(&self.namespace, key).await {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!(
                    store = %self.spec.name,
                    key,
                    error = %err,
                    "read failed, treating record as absent"
                );
                None
            }
        }
    }

    /// Writes the blob under `key`, resolving once it is durable.
    ///
    /// # Errors
    ///
    /// Returns the backend error if the write is not confirmed.
    pub async fn put(&self, handle: &B::Handle, key: &str, value: Bytes) -> StorageResult<()> {
        let len = value.len();
        handle.put(&self.namespace, key, value).await?;
        tracing::debug!(store = %self.spec.name, key, bytes = len, "record written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryBackend;

    fn store() -> KvStore<InMemoryBackend> {
        KvStore::new(InMemoryBackend::new(), StoreSpec::new("db", 1, "files"))
    }

    #[tokio::test]
    async fn get_absent_key() {
        let store = store();
        let handle = store.open().await.unwrap();
        assert!(store.get(&handle, "missing").await.is_none());
    }

    #[tokio::test]
    async fn put_then_get() {
        let store = store();
        let handle = store.open().await.unwrap();
        store
            .put(&handle, "k", Bytes::from_static(b"v1"))
            .await
            .unwrap();
        store
            .put(&handle, "k", Bytes::from_static(b"v2"))
            .await
            .unwrap();
        assert_eq!(store.get(&handle, "k").await.unwrap(), Bytes::from_static(b"v2"));
    }

    #[tokio::test]
    async fn read_failure_is_absent() {
        let backend = InMemoryBackend::new();
        let opener = KvStore::new(backend.clone(), StoreSpec::new("db", 1, "files"));
        let handle = opener.open().await.unwrap();

        // Same store, but a namespace the upgrade never created.
        let other = KvStore::new(backend, StoreSpec::new("db", 1, "other"));
        assert!(other.get(&handle, "k").await.is_none());
    }

    #[tokio::test]
    async fn write_failure_propagates() {
        let backend = InMemoryBackend::new();
        let opener = KvStore::new(backend.clone(), StoreSpec::new("db", 1, "files"));
        let handle = opener.open().await.unwrap();

        let other = KvStore::new(backend, StoreSpec::new("db", 1, "other"));
        let result = other.put(&handle, "k", Bytes::from_static(b"v")).await;
        assert!(matches!(
            result,
            Err(crate::StorageError::MissingNamespace(_))
        ));
    }
}
