//! API errors.
//!
//! Every handler returns `Result<T, ApiError>`. The response body is always
//! `{"error": "<summary>", "details": "<cause>"}`; the status follows the
//! storage error kind.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use registry_core::StorageError;
use serde_json::json;
use thiserror::Error;

/// Errors surfaced by request handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Request body was not a decodable record.
    #[error("invalid JSON: {0}")]
    InvalidJson(String),

    /// A required query parameter was missing or empty.
    #[error("{0}")]
    MissingParameter(&'static str),

    /// A storage operation failed. `summary` names what was attempted.
    #[error("{summary}: {source}")]
    Storage {
        /// Short, client-facing description of the failed action
        summary: &'static str,
        /// Underlying storage error
        #[source]
        source: StorageError,
    },
}

impl ApiError {
    /// Wrap a storage failure with the action that was attempted.
    pub fn storage(summary: &'static str) -> impl FnOnce(StorageError) -> Self {
        move |source| Self::Storage { summary, source }
    }

    /// HTTP status for this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidJson(_) | Self::MissingParameter(_) => StatusCode::BAD_REQUEST,
            Self::Storage { source, .. } => match source {
                StorageError::InvalidId | StorageError::Validation(_) => StatusCode::BAD_REQUEST,
                StorageError::NotFound(_) => StatusCode::NOT_FOUND,
                StorageError::AlreadyExists(_) => StatusCode::CONFLICT,
                StorageError::Connection(_)
                | StorageError::Timeout { .. }
                | StorageError::Read { .. }
                | StorageError::Write { .. }
                | StorageError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    fn summary(&self) -> &'static str {
        match self {
            Self::InvalidJson(_) => "Invalid JSON",
            Self::MissingParameter(message) => *message,
            Self::Storage { summary, source } => match source {
                StorageError::InvalidId => "Server ID is required",
                StorageError::Validation(_) => "Validation failed",
                StorageError::NotFound(_) => "Server not found",
                StorageError::AlreadyExists(_) => "Server already exists",
                _ => *summary,
            },
        }
    }

    fn details(&self) -> String {
        match self {
            Self::Storage { source, .. } => source.to_string(),
            other => other.to_string(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::InvalidJson(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "request rejected");
        }

        let body = json!({
            "error": self.summary(),
            "details": self.details(),
        });
        (status, Json(body)).into_response()
    }
}
