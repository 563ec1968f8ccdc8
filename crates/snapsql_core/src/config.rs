//! Database configuration.

use snapsql_storage::StoreSpec;

/// What `initialize` does when the durable store cannot be opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendPolicy {
    /// Continue with a fresh in-memory database; persists retry the open.
    #[default]
    Degrade,
    /// Fail `initialize` with `BackendUnavailable`; a later call may retry.
    Fail,
}

/// Configuration for a [`LifecycleManager`](crate::LifecycleManager).
#[derive(Debug, Clone)]
pub struct Config {
    /// Name of the durable store.
    pub store_name: String,

    /// Store schema version. Raising it runs the store upgrade once.
    pub store_version: u32,

    /// Namespace holding the durable record.
    pub namespace: String,

    /// Key of the durable record.
    pub record_key: String,

    /// Oldest SQLite library accepted at engine start, as
    /// `rusqlite::version_number()` reports it.
    pub min_engine_version: i32,

    /// Behavior when the store cannot be opened during bootstrap.
    pub on_backend_unavailable: BackendPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_name: "my-sqlite-db".to_string(),
            store_version: 1,
            namespace: "sqlite-files".to_string(),
            record_key: "sqlite-export".to_string(),
            min_engine_version: 3_024_000,
            on_backend_unavailable: BackendPolicy::Degrade,
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the store name.
    #[must_use]
    pub fn store_name(mut self, name: impl Into<String>) -> Self {
        self.store_name = name.into();
        self
    }

    /// Sets the store version.
    #[must_use]
    pub const fn store_version(mut self, version: u32) -> Self {
        self.store_version = version;
        self
    }

    /// Sets the record namespace.
    #[must_use]
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Sets the record key.
    #[must_use]
    pub fn record_key(mut self, key: impl Into<String>) -> Self {
        self.record_key = key.into();
        self
    }

    /// Sets the minimum accepted SQLite version number.
    #[must_use]
    pub const fn min_engine_version(mut self, version: i32) -> Self {
        self.min_engine_version = version;
        self
    }

    /// Sets the store-open failure policy.
    #[must_use]
    pub const fn on_backend_unavailable(mut self, policy: BackendPolicy) -> Self {
        self.on_backend_unavailable = policy;
        self
    }

    /// Store spec used to open the backend.
    pub fn store_spec(&self) -> StoreSpec {
        StoreSpec::new(
            self.store_name.clone(),
            self.store_version,
            self.namespace.clone(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.store_name, "my-sqlite-db");
        assert_eq!(config.store_version, 1);
        assert_eq!(config.namespace, "sqlite-files");
        assert_eq!(config.record_key, "sqlite-export");
        assert_eq!(config.on_backend_unavailable, BackendPolicy::Degrade);
        assert!(rusqlite::version_number() >= config.min_engine_version);
    }

    #[test]
    fn builder_pattern() {
        let config = Config::new()
            .store_name("scores")
            .store_version(3)
            .record_key("dump")
            .on_backend_unavailable(BackendPolicy::Fail);

        assert_eq!(config.store_name, "scores");
        assert_eq!(config.store_version, 3);
        assert_eq!(config.record_key, "dump");
        assert_eq!(config.on_backend_unavailable, BackendPolicy::Fail);
    }

    #[test]
    fn store_spec_carries_namespace() {
        let spec = Config::new().namespace("blobs").store_spec();
        assert_eq!(spec.name, "my-sqlite-db");
        assert_eq!(spec.version, 1);
        assert_eq!(spec.namespaces, vec!["blobs".to_string()]);
    }
}
