//! API error types and JSON error response formatting.
//!
//! ApiError gives every endpoint the same `{error, message}` body and maps
//! engine error kinds to HTTP status codes.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use trellis_core::error::{ErrorKind, TrellisError};

/// JSON error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Machine-readable error code (e.g., "bad_request", "not_found").
    pub error: String,
    /// Human-readable error message.
    pub message: String,
}

/// API error type that maps to HTTP status codes and JSON responses.
#[derive(Debug)]
pub enum ApiError {
    /// 400 Bad Request - invalid parameters, weights or vector lengths.
    BadRequest(String),
    /// 404 Not Found - node or edge does not exist.
    NotFound(String),
    /// 502 Bad Gateway - the embedding or extraction service failed.
    BadGateway(String),
    /// 500 Internal Server Error - unexpected server error.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            ApiError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, "collaborator_failure", msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", msg),
        };

        let body = ErrorBody {
            error: error_code.to_string(),
            message,
        };

        (status, Json(body)).into_response()
    }
}

impl From<TrellisError> for ApiError {
    fn from(err: TrellisError) -> Self {
        let message = err.to_string();
        match err.kind() {
            ErrorKind::NotFound => ApiError::NotFound(message),
            ErrorKind::DimensionMismatch
            | ErrorKind::InvalidWeight
            | ErrorKind::InvalidArgument => ApiError::BadRequest(message),
            ErrorKind::CollaboratorFailure => ApiError::BadGateway(message),
            ErrorKind::Internal => ApiError::Internal(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: TrellisError) -> StatusCode {
        ApiError::from(err).into_response().status()
    }

    #[test]
    fn test_kind_to_status() {
        assert_eq!(status_of(TrellisError::NodeNotFound(1)), StatusCode::NOT_FOUND);
        assert_eq!(status_of(TrellisError::EdgeNotFound(1)), StatusCode::NOT_FOUND);
        assert_eq!(
            status_of(TrellisError::DimensionMismatch {
                expected: 3,
                actual: 2
            }),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(status_of(TrellisError::InvalidWeight(-1.0)), StatusCode::BAD_REQUEST);
        assert_eq!(
            status_of(TrellisError::InvalidArgument("alpha".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(status_of(TrellisError::embedding("down")), StatusCode::BAD_GATEWAY);
        assert_eq!(
            status_of(TrellisError::Storage("Lock poisoned".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
