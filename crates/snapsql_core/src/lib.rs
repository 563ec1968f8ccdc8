//! # SnapSQL Core
//!
//! An in-memory SQL database that survives restarts by checkpointing full
//! snapshots of itself into a durable key-value store.
//!
//! This crate provides:
//! - [`LifecycleManager`]: single-flight bootstrap of the one shared
//!   [`Database`] (engine start, load-or-create, first persist)
//! - [`DurabilityCoordinator`]: serialized, coalescing snapshot writes
//!   after every mutation
//! - [`Config`]: store naming and failure policy
//!
//! ## Usage
//!
//! ```rust
//! use snapsql_core::{Config, InMemoryBackend, LifecycleManager};
//!
//! # let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
//! # rt.block_on(async {
//! let manager = LifecycleManager::new(InMemoryBackend::new(), Config::default());
//! let db = manager.initialize().await.unwrap();
//!
//! db.execute_batch("CREATE TABLE IF NOT EXISTS scores (name TEXT, ms INTEGER)").unwrap();
//! db.execute("INSERT INTO scores VALUES (?1, ?2)", ("abc", 180)).unwrap();
//! manager.persist().await.unwrap();
//! # });
//! ```
//!
//! Mutations are durable only once the persist that follows them resolves.
//! There is no background or exit-time flush.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod coordinator;
mod database;
mod error;
mod lifecycle;
mod stats;

pub use config::{BackendPolicy, Config};
pub use coordinator::DurabilityCoordinator;
pub use database::{Database, Origin};
pub use error::{CoreError, CoreResult};
pub use lifecycle::{LifecycleManager, LifecycleState};
pub use stats::{LifecycleStats, StatsSnapshot};

pub use snapsql_codec::Snapshot;
pub use snapsql_storage::{FileBackend, InMemoryBackend, StoreBackend};
