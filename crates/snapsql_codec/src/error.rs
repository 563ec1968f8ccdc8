//! Error types for the codec crate.

use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors that can occur during encoding or decoding.
#[derive(Error, Debug)]
pub enum CodecError {
    /// The embedded engine rejected a statement.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Failed to encode the snapshot body.
    #[error("encoding failed: {message}")]
    EncodingFailed {
        /// Description of the encoding error.
        message: String,
    },

    /// Failed to decode the snapshot body.
    #[error("decoding failed: {message}")]
    DecodingFailed {
        /// Description of the decoding error.
        message: String,
    },

    /// The bytes are not a snapshot.
    #[error("invalid snapshot format: {message}")]
    InvalidFormat {
        /// Description of the format issue.
        message: String,
    },

    /// The snapshot was written by a newer format.
    #[error("unsupported snapshot format version: {0}")]
    UnsupportedVersion(u16),

    /// The trailing checksum does not match the content.
    #[error("checksum mismatch: snapshot is damaged")]
    ChecksumMismatch,

    /// The connection has an uncommitted transaction.
    #[error("cannot snapshot inside an open transaction")]
    OpenTransaction,

    /// The database holds something snapshots cannot represent.
    #[error("unsupported: {message}")]
    Unsupported {
        /// What is unsupported.
        message: String,
    },
}

impl CodecError {
    /// Create an encoding failed error.
    pub fn encoding_failed(message: impl Into<String>) -> Self {
        Self::EncodingFailed {
            message: message.into(),
        }
    }

    /// Create a decoding failed error.
    pub fn decoding_failed(message: impl Into<String>) -> Self {
        Self::DecodingFailed {
            message: message.into(),
        }
    }

    /// Create an invalid format error.
    pub fn invalid_format(message: impl Into<String>) -> Self {
        Self::InvalidFormat {
            message: message.into(),
        }
    }

    /// Create an unsupported error.
    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::Unsupported {
            message: message.into(),
        }
    }

    /// Returns true if the error means the stored bytes are damaged or
    /// foreign, as opposed to an engine failure while replaying them.
    /// A snapshot from a newer format is intact and does not count.
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            CodecError::DecodingFailed { .. }
                | CodecError::InvalidFormat { .. }
                | CodecError::ChecksumMismatch
        )
    }
}
