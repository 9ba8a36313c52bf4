//! Storage errors shared by every backend.

use super::record::ValidationErrors;

/// Errors returned by [`StorageBackend`](super::StorageBackend) operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// An ID-keyed operation was given an empty id.
    #[error("invalid server ID")]
    InvalidId,

    /// The targeted record does not exist.
    #[error("server not found: {0}")]
    NotFound(String),

    /// Create collided with an existing id (or, on the durable backend, name).
    #[error("server already exists: {0}")]
    AlreadyExists(String),

    /// Required fields were missing.
    #[error(transparent)]
    Validation(#[from] ValidationErrors),

    /// Could not open or reach the backing store.
    #[error("connection error: {0}")]
    Connection(String),

    /// A read against the backing store failed.
    #[error("{operation} read failed: {message}")]
    Read {
        /// Operation that was running
        operation: &'static str,
        /// Underlying cause
        message: String,
    },

    /// A write against the backing store failed.
    #[error("{operation} write failed: {message}")]
    Write {
        /// Operation that was running
        operation: &'static str,
        /// Underlying cause
        message: String,
    },

    /// The operation did not finish within its deadline.
    #[error("{operation} timed out after {timeout_ms}ms")]
    Timeout {
        /// Operation that was running
        operation: &'static str,
        /// Deadline that elapsed
        timeout_ms: u64,
    },

    /// Stored data could not be interpreted.
    #[error("internal storage error: {0}")]
    Internal(String),
}

impl StorageError {
    /// Read failure during `operation`.
    pub fn read(operation: &'static str, message: impl Into<String>) -> Self {
        Self::Read {
            operation,
            message: message.into(),
        }
    }

    /// Write failure during `operation`.
    pub fn write(operation: &'static str, message: impl Into<String>) -> Self {
        Self::Write {
            operation,
            message: message.into(),
        }
    }

    /// Connection failure.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection(message.into())
    }

    /// Corrupt or unexpected stored data.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// True for the not-found case.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// True for the duplicate-key case.
    #[must_use]
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists(_))
    }
}

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
