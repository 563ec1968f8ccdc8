//! Backend trait definitions.

use crate::error::StorageResult;
use async_trait::async_trait;
use bytes::Bytes;

/// Describes a store to open: its name, version and namespaces.
///
/// Opening a store whose recorded version is lower than `version` runs the
/// upgrade, which creates every namespace in `namespaces` that does not
/// exist yet. Opening at the recorded version never touches the structure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreSpec {
    /// Store name (one store per logical database).
    pub name: String,
    /// Structural version of the store. Must be at least 1.
    pub version: u32,
    /// Namespaces the upgrade creates.
    pub namespaces: Vec<String>,
}

impl StoreSpec {
    /// Creates a spec with a single namespace.
    pub fn new(name: impl Into<String>, version: u32, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version,
            namespaces: vec![namespace.into()],
        }
    }

    /// Adds another namespace to the upgrade.
    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespaces.push(namespace.into());
        self
    }
}

/// A durable key-value backend.
///
/// The backend is a factory for store handles, in the way a browser's
/// `indexedDB` global opens databases by name and version.
///
/// # Invariants
///
/// - The first open of a store at a given version runs the upgrade exactly
///   once, even when several opens race
/// - Opening at a version lower than the recorded one fails with
///   [`crate::StorageError::VersionDowngrade`]
#[async_trait]
pub trait StoreBackend: Send + Sync + 'static {
    /// Handle type returned by [`StoreBackend::open`].
    type Handle: StoreHandle;

    /// Opens (and if needed upgrades) the store described by `spec`.
    ///
    /// # Errors
    ///
    /// Returns an error if the host refuses access, the recorded version is
    /// newer than `spec.version`, or backend metadata is unreadable.
    async fn open(&self, spec: &StoreSpec) -> StorageResult<Self::Handle>;
}

/// An opened store.
#[async_trait]
pub trait StoreHandle: Send + Sync + 'static {
    /// Name of the opened store.
    fn name(&self) -> &str;

    /// Version the store was opened at.
    fn version(&self) -> u32;

    /// The previous version if this open ran the upgrade.
    fn upgraded_from(&self) -> Option<u32>;

    /// Reads the blob stored under `key`.
    ///
    /// Returns `Ok(None)` if the key was never written.
    ///
    /// # Errors
    ///
    /// Returns an error if the namespace does not exist or the read fails.
    async fn get(&self, namespace: &str, key: &str) -> StorageResult<Option<Bytes>>;

    /// Writes `value` under `key`, replacing any previous blob.
    ///
    /// Resolves only once the write is durable.
    ///
    /// # Errors
    ///
    /// Returns an error if the namespace does not exist or the write fails.
    async fn put(&self, namespace: &str, key: &str, value: Bytes) -> StorageResult<()>;
}
