//! # SnapSQL Storage
//!
//! Durable key-value backends that hold SnapSQL snapshots.
//!
//! A backend is a set of named, versioned **stores**. Each store contains
//! one or more **namespaces**, and each namespace maps string keys to opaque
//! byte blobs. Backends do not interpret the blobs they hold.
//!
//! ## Design Principles
//!
//! - Opening a store at a higher version runs a one-time structural upgrade
//!   that creates the requested namespaces
//! - Concurrent opens never run the same upgrade twice
//! - `put` resolves only after the backend has made the write durable
//! - Backends must be `Send + Sync` so a handle can be shared by every task
//!
//! ## Available Backends
//!
//! - [`InMemoryBackend`] - For testing and ephemeral storage
//! - [`FileBackend`] - Directory-per-store persistent storage
//!
//! ## Example
//!
//! ```rust
//! use snapsql_storage::{InMemoryBackend, KvStore, StoreSpec};
//! use bytes::Bytes;
//!
//! # tokio_test();
//! # fn tokio_test() {
//! # let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
//! # rt.block_on(async {
//! let store = KvStore::new(InMemoryBackend::new(), StoreSpec::new("app", 1, "files"));
//! let handle = store.open().await.unwrap();
//! store.put(&handle, "latest", Bytes::from_static(b"blob")).await.unwrap();
//! assert_eq!(store.get(&handle, "latest").await.unwrap(), Bytes::from_static(b"blob"));
//! # });
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod adapter;
mod backend;
mod error;
mod file;
mod manifest;
mod memory;

pub use adapter::KvStore;
pub use backend::{StoreBackend, StoreHandle, StoreSpec};
pub use error::{StorageError, StorageResult};
pub use file::{FileBackend, FileHandle};
pub use manifest::StoreManifest;
pub use memory::{BackendCounters, InMemoryBackend, MemoryHandle};
