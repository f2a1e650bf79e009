//! Error types for ats-survey HTTP handlers

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::services::{ScanError, SessionError};

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Conflict (409), e.g. survey already submitted
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// ats-common error
    #[error(transparent)]
    Common(#[from] ats_common::Error),

    /// Pool rescan failed
    #[error(transparent)]
    Scan(#[from] ScanError),
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::NotFound(_) => ApiError::NotFound(err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg),
            ApiError::Common(ats_common::Error::InvalidInput(msg)) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg)
            }
            ApiError::Common(ats_common::Error::NotFound(msg)) => {
                (StatusCode::NOT_FOUND, "NOT_FOUND", msg)
            }
            ApiError::Common(ats_common::Error::Conflict(msg)) => {
                (StatusCode::CONFLICT, "CONFLICT", msg)
            }
            ApiError::Common(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                err.to_string(),
            ),
            ApiError::Scan(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "POOL_SCAN_FAILED",
                err.to_string(),
            ),
        };

        if status.is_server_error() {
            tracing::error!(code = error_code, "{}", message);
        }

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
