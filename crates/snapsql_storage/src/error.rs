//! Error types for storage operations.

use std::io;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The host environment refused access to the backend.
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    /// The store on disk is newer than the version being opened.
    #[error("store version {stored} is newer than requested version {requested}")]
    VersionDowngrade {
        /// Version recorded by the backend.
        stored: u32,
        /// Version the caller asked for.
        requested: u32,
    },

    /// The namespace was never created by an upgrade.
    #[error("namespace not found: {0}")]
    MissingNamespace(String),

    /// Backend metadata could not be parsed.
    #[error("storage corrupted: {0}")]
    Corrupted(String),

    /// A failure injected by a test harness.
    #[error("injected failure: {0}")]
    Injected(String),
}

impl StorageError {
    /// Creates an unavailable error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable(message.into())
    }

    /// Creates a corruption error.
    pub fn corrupted(message: impl Into<String>) -> Self {
        Self::Corrupted(message.into())
    }

    /// Creates an injected failure.
    pub fn injected(message: impl Into<String>) -> Self {
        Self::Injected(message.into())
    }

    /// Wraps a failed blocking task.
    pub(crate) fn join(err: tokio::task::JoinError) -> Self {
        Self::Io(io::Error::new(io::ErrorKind::Other, err.to_string()))
    }
}
