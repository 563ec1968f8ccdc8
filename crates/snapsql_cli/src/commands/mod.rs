//! CLI command implementations.

pub mod exec;
pub mod inspect;
pub mod query;
pub mod transfer;

use snapsql_core::{Config, FileBackend, LifecycleManager};
use snapsql_storage::{KvStore, StoreManifest};
use std::path::PathBuf;

/// Result type shared by every command.
pub type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// The store a command operates on.
pub struct Target {
    root: PathBuf,
    store: String,
}

impl Target {
    pub fn new(root: PathBuf, store: String) -> Self {
        Self { root, store }
    }

    pub fn backend(&self) -> FileBackend {
        FileBackend::new(&self.root)
    }

    /// Manifest of the store, if it was ever created.
    pub fn manifest(&self) -> CliResult<Option<StoreManifest>> {
        Ok(self.backend().read_manifest(&self.store)?)
    }

    /// Config for this store, keeping its recorded version.
    pub fn config(&self) -> CliResult<Config> {
        let version = self.manifest()?.map_or(1, |m| m.version.max(1));
        Ok(Config::new()
            .store_name(self.store.clone())
            .store_version(version))
    }

    pub fn manager(&self) -> CliResult<LifecycleManager<FileBackend>> {
        Ok(LifecycleManager::new(self.backend(), self.config()?))
    }

    /// Adapter over an existing store.
    pub fn existing(&self) -> CliResult<(KvStore<FileBackend>, Config)> {
        if self.manifest()?.is_none() {
            return Err(format!(
                "No store '{}' found under {}",
                self.store,
                self.root.display()
            )
            .into());
        }
        let config = self.config()?;
        Ok((KvStore::new(self.backend(), config.store_spec()), config))
    }

    pub fn describe(&self) -> String {
        self.root.join(&self.store).display().to_string()
    }
}
