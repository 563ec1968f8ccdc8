//! Error types for SnapSQL core.

use snapsql_codec::CodecError;
use snapsql_storage::StorageError;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that cross the core boundary.
///
/// `Clone` so a single bootstrap outcome can be handed to every caller that
/// waited on it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// The database was requested before `initialize` completed.
    #[error("database not initialized")]
    NotInitialized,

    /// The embedded engine could not start. Terminal for the manager.
    #[error("engine bootstrap failed: {message}")]
    EngineBootstrapFailed {
        /// Description of the failure.
        message: String,
    },

    /// A snapshot could not be produced or written.
    #[error("persist failed: {message}")]
    PersistFailed {
        /// Description of the failure.
        message: String,
    },

    /// The durable store could not be opened.
    #[error("backend unavailable: {message}")]
    BackendUnavailable {
        /// Description of the failure.
        message: String,
    },
}

impl CoreError {
    /// Creates an engine bootstrap error.
    pub fn engine_bootstrap_failed(message: impl Into<String>) -> Self {
        Self::EngineBootstrapFailed {
            message: message.into(),
        }
    }

    /// Creates a persist error.
    pub fn persist_failed(message: impl Into<String>) -> Self {
        Self::PersistFailed {
            message: message.into(),
        }
    }

    /// Creates a backend unavailable error.
    pub fn backend_unavailable(message: impl Into<String>) -> Self {
        Self::BackendUnavailable {
            message: message.into(),
        }
    }

    /// Returns true if the manager can never recover from this error.
    pub fn is_terminal(&self) -> bool {
        matches!(self, CoreError::EngineBootstrapFailed { .. })
    }

    pub(crate) fn from_put(err: &StorageError) -> Self {
        Self::persist_failed(err.to_string())
    }

    pub(crate) fn from_encode(err: &CodecError) -> Self {
        Self::persist_failed(format!("snapshot encoding: {err}"))
    }

    pub(crate) fn from_open(err: &StorageError) -> Self {
        Self::backend_unavailable(err.to_string())
    }
}
