//! Test fixtures and store helpers.
//!
//! Provides temporary file stores that outlive several managers, so a test
//! can simulate a process restart by building a second manager over the
//! same directory.

use snapsql_core::{Config, FileBackend, InMemoryBackend, LifecycleManager};
use std::path::Path;
use tempfile::TempDir;

/// A file backend rooted in a temporary directory.
///
/// The directory is removed when this value is dropped.
pub struct TempStore {
    dir: TempDir,
}

impl TempStore {
    /// Creates an empty temporary store root.
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Root directory of the backend.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// A backend over this directory. Each call models a new process.
    pub fn backend(&self) -> FileBackend {
        FileBackend::new(self.dir.path())
    }

    /// A fresh manager over this directory with the default config.
    pub fn manager(&self) -> LifecycleManager<FileBackend> {
        LifecycleManager::new(self.backend(), Config::default())
    }
}

impl Default for TempStore {
    fn default() -> Self {
        Self::new()
    }
}

/// A manager over a new in-memory backend, plus a clone of that backend
/// for assertions and restarts.
pub fn memory_manager() -> (InMemoryBackend, LifecycleManager<InMemoryBackend>) {
    memory_manager_with(Config::default())
}

/// Like [`memory_manager`] with a custom config.
pub fn memory_manager_with(
    config: Config,
) -> (InMemoryBackend, LifecycleManager<InMemoryBackend>) {
    let backend = InMemoryBackend::new();
    (backend.clone(), LifecycleManager::new(backend, config))
}

/// Counts rows of `table` in a connection.
pub fn count_rows(conn: &rusqlite::Connection, table: &str) -> i64 {
    conn.query_row(
        &format!("SELECT count(*) FROM \"{}\"", table.replace('"', "\"\"")),
        [],
        |r| r.get(0),
    )
    .expect("Failed to count rows")
}
