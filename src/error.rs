//! Error types for the media subsystem
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

// == Media Error Enum ==
/// Unified error type for the media subsystem.
///
/// Fetch failures seen by the load machine never reach consumers as this
/// type; they are folded into `LoadState`. These variants surface only from
/// explicit validation, the storage client and the operator API.
#[derive(Error, Debug)]
pub enum MediaError {
    /// Key not found in cache
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Configuration makes the subsystem unusable
    #[error("Configuration error: {0}")]
    Config(String),

    /// Object storage proxy rejected or failed a request
    #[error("Storage error: {0}")]
    Storage(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

// == IntoResponse Implementation ==
impl IntoResponse for MediaError {
    fn into_response(self) -> Response {
        let status = match &self {
            MediaError::NotFound(_) => StatusCode::NOT_FOUND,
            MediaError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            MediaError::Config(_) => StatusCode::SERVICE_UNAVAILABLE,
            MediaError::Storage(_) => StatusCode::BAD_GATEWAY,
            MediaError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(ErrorResponse::new(self.to_string()));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the media subsystem.
pub type Result<T> = std::result::Result<T, MediaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (MediaError::NotFound("k".into()), StatusCode::NOT_FOUND),
            (MediaError::InvalidRequest("x".into()), StatusCode::BAD_REQUEST),
            (MediaError::Config("x".into()), StatusCode::SERVICE_UNAVAILABLE),
            (MediaError::Storage("x".into()), StatusCode::BAD_GATEWAY),
            (MediaError::Internal("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }

    #[test]
    fn test_display_includes_detail() {
        let err = MediaError::Config("PUBLIC_BASE_URL is not set".into());
        assert!(err.to_string().contains("PUBLIC_BASE_URL"));
    }
}
