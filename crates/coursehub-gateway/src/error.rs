//! Gateway error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use coursehub_core::error::NameError;
use coursehub_store::StoreError;
use thiserror::Error;

/// Errors that can occur in the gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Caller could not be authenticated.
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Inbound payload could not be understood.
    #[error("Malformed message: {0}")]
    Malformed(String),

    /// Durable storage failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),

    /// Invalid room or user name.
    #[error("Invalid name: {0}")]
    InvalidName(#[from] NameError),

    /// Request rejected by policy (origin, ownership).
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Not found error.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Too many inbound messages.
    #[error("Rate limit exceeded")]
    RateLimited,

    /// Server is at capacity.
    #[error("Unavailable: {0}")]
    Unavailable(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// Wire error code sent in `error` frames and HTTP error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Auth(_) => "authentication_failed",
            Self::Malformed(_) => "malformed_message",
            Self::Storage(_) => "storage_failure",
            Self::InvalidName(_) => "invalid_name",
            Self::Forbidden(_) => "forbidden",
            Self::NotFound(_) => "not_found",
            Self::RateLimited => "rate_limited",
            Self::Unavailable(_) => "unavailable",
            Self::Io(_) | Self::Internal(_) => "internal_error",
        }
    }

    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Auth(_) => StatusCode::UNAUTHORIZED,
            Self::Malformed(_) | Self::InvalidName(_) => StatusCode::BAD_REQUEST,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::Storage(_) | Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Io(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether this error counts toward a connection's storage outage limit.
    pub fn is_storage(&self) -> bool {
        matches!(self, Self::Storage(_))
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Authentication failures close without a body
        if matches!(self, Self::Auth(_)) {
            return status.into_response();
        }

        let body = serde_json::json!({
            "error": self.code(),
            "message": self.to_string(),
        });
        (status, Json(body)).into_response()
    }
}
