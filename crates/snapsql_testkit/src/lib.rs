//! # SnapSQL Testkit
//!
//! Test utilities for SnapSQL.
//!
//! This crate provides:
//! - Temporary file stores and manager helpers
//! - [`FaultyBackend`], a wrapper that fails store operations on demand
//! - [`ReactionTimes`], a sample schema collaborator
//! - Property-based test generators using proptest
//!
//! ## Usage
//!
//! ```rust
//! use snapsql_testkit::prelude::*;
//!
//! # let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
//! # rt.block_on(async {
//! let store = TempStore::new();
//! let tests = ReactionTimes::new(store.manager());
//! tests.ensure_schema().await.unwrap();
//! tests.add_test("abc", 100, 180, 80).await.unwrap();
//! # });
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod faulty;
pub mod fixtures;
pub mod generators;
pub mod reaction;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::faulty::*;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::reaction::*;
}

pub use faulty::*;
pub use fixtures::*;
pub use generators::*;
pub use reaction::*;
