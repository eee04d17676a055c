//! Error types and HTTP error response handling.
//!
//! This module defines all request-level errors and how they are converted
//! into HTTP responses with appropriate status codes and JSON bodies.
//! Failures inside a single number lookup never reach this type; they are
//! reported in that number's `LookupResult` instead.

use axum::{
    Json,
    extract::rejection::BytesRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// Application-wide error type.
///
/// # Error Categories
///
/// - **Input Errors**: missing or malformed request fields
/// - **Authentication Errors**: missing, unknown or under-privileged API keys
/// - **Quota Errors**: the key has used up its limit
/// - **Readiness Errors**: the messaging connection is not ready
/// - **Persistence Errors**: any sqlx::Error from the key store
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Key store operation failed.
    ///
    /// Returns HTTP 500 without exposing the driver message.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// No API key was supplied.
    ///
    /// Returns HTTP 401 Unauthorized.
    #[error("API key required")]
    MissingApiKey,

    /// The supplied API key is not in the store.
    ///
    /// Returns HTTP 403 Forbidden.
    #[error("Invalid API key")]
    InvalidApiKey,

    /// The key is valid but is not an admin key.
    ///
    /// Returns HTTP 403 Forbidden.
    #[error("Admin privileges required")]
    AdminRequired,

    /// The key reached its usage limit.
    ///
    /// Returns HTTP 429 Too Many Requests.
    #[error("API key usage limit reached")]
    QuotaExceeded,

    /// Revoke target does not exist.
    ///
    /// Returns HTTP 404 Not Found.
    #[error("API key not found")]
    KeyNotFound,

    /// The messaging connection cannot serve lookups right now.
    ///
    /// Returns HTTP 500.
    #[error("Messaging connection is not ready")]
    SocketNotReady,

    /// Request body or parameters are invalid.
    ///
    /// Returns HTTP 400 Bad Request.
    /// The String names the offending field.
    #[error("{0}")]
    InvalidRequest(String),

    /// Request body exceeds the configured limit.
    ///
    /// Returns HTTP 413 Payload Too Large.
    #[error("Request body too large")]
    PayloadTooLarge,
}

impl AppError {
    /// Stable machine-readable code sent in the `error` field.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Database(_) => "internal_error",
            AppError::MissingApiKey => "missing_key",
            AppError::InvalidApiKey => "invalid_key",
            AppError::AdminRequired => "admin_required",
            AppError::QuotaExceeded => "quota_exceeded",
            AppError::KeyNotFound => "key_not_found",
            AppError::SocketNotReady => "socket_not_ready",
            AppError::InvalidRequest(_) => "invalid_request",
            AppError::PayloadTooLarge => "payload_too_large",
        }
    }

    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Database(_) | AppError::SocketNotReady => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::MissingApiKey => StatusCode::UNAUTHORIZED,
            AppError::InvalidApiKey | AppError::AdminRequired => StatusCode::FORBIDDEN,
            AppError::QuotaExceeded => StatusCode::TOO_MANY_REQUESTS,
            AppError::KeyNotFound => StatusCode::NOT_FOUND,
            AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AppError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
        }
    }
}

/// Body buffering failures from the `Bytes` extractor.
///
/// Bodies without a `Content-Length` are only measured while buffering, so
/// the limit can still trip here.
impl From<BytesRejection> for AppError {
    fn from(rejection: BytesRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            AppError::PayloadTooLarge
        } else {
            AppError::InvalidRequest(rejection.body_text())
        }
    }
}

/// Convert AppError into an HTTP response.
///
/// # Response Format
///
/// All errors return JSON in this format:
/// ```json
/// {
///   "error": "quota_exceeded",
///   "message": "API key usage limit reached"
/// }
/// ```
///
/// Database errors are logged here and replaced by an opaque message.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();

        let message = match &self {
            AppError::Database(err) => {
                tracing::error!(error = %err, "key store operation failed");
                "An internal error occurred".to_string()
            }
            other => other.to_string(),
        };

        let body = Json(json!({
            "error": code,
            "message": message
        }));

        (status, body).into_response()
    }
}
