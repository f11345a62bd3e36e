//! Ledger error types with HTTP status code mapping.
//!
//! [`LedgerError`] is the central error type for the crate. The record
//! store, the ledger service and the settlement queries surface it to their
//! callers; the sync orchestrator records it into the sync status instead
//! of propagating it. Each variant maps to a specific HTTP status code and
//! structured JSON error response.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::{Collection, RecordId};

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 1001,
///     "message": "invalid record: expense needs at least one participant",
///     "details": null
///   }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Numeric error code.
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category        | HTTP Status                     |
/// |-----------|-----------------|---------------------------------|
/// | 1000–1999 | Validation      | 400 Bad Request                 |
/// | 2000–2999 | State/Not Found | 401 / 404 / 409                 |
/// | 3000–3999 | Storage/Server  | 500 Internal Server Error       |
/// | 5000–5999 | Remote          | 503 Service Unavailable         |
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// No user identity could be resolved.
    #[error("not authenticated")]
    NotAuthenticated,

    /// The addressed record does not exist.
    #[error("{collection} record not found: {id}")]
    NotFound {
        /// Collection that was searched.
        collection: Collection,
        /// Missing id.
        id: RecordId,
    },

    /// A group or expense failed validation; nothing was written.
    #[error("invalid record: {0}")]
    Validation(String),

    /// Stored data could not be parsed.
    #[error("corrupt data under key {key}: {reason}")]
    StorageCorrupt {
        /// Storage key holding the unreadable value.
        key: String,
        /// Parser message.
        reason: String,
    },

    /// Local storage I/O failure.
    #[error("storage error: {0}")]
    Storage(String),

    /// The remote store could not be reached or rejected the request.
    #[error("remote unavailable: {0}")]
    RemoteUnavailable(String),

    /// A reconciliation is already running.
    #[error("a sync is already in progress")]
    SyncInProgress,

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl LedgerError {
    /// Shorthand for [`LedgerError::NotFound`].
    #[must_use]
    pub fn not_found(collection: Collection, id: &RecordId) -> Self {
        Self::NotFound {
            collection,
            id: id.clone(),
        }
    }

    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::Validation(_) => 1001,
            Self::NotAuthenticated => 2001,
            Self::NotFound { .. } => 2002,
            Self::SyncInProgress => 2003,
            Self::Internal(_) => 3000,
            Self::Storage(_) => 3001,
            Self::StorageCorrupt { .. } => 3002,
            Self::RemoteUnavailable(_) => 5001,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotAuthenticated => StatusCode::UNAUTHORIZED,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::SyncInProgress => StatusCode::CONFLICT,
            Self::Storage(_) | Self::StorageCorrupt { .. } | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::RemoteUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for LedgerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
                details: None,
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}
