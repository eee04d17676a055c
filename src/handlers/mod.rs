//! HTTP request handlers (route handlers).
//!
//! Each handler is an async function that:
//! 1. Receives HTTP request data (JSON body, query string, auth context)
//! 2. Delegates to the lookup engine or the key guard
//! 3. Returns a JSON response

use axum::{body::Bytes, extract::rejection::BytesRejection};
use serde::de::DeserializeOwned;

use crate::error::AppError;

/// Key management endpoints
pub mod api_keys;
/// Liveness and health endpoints
pub mod health;
/// Number lookup endpoints
pub mod lookup;

/// Parse a JSON request body, treating an empty body as `T::default()`.
///
/// Used instead of the `Json` extractor so malformed and oversized bodies get
/// the same `{error, message}` shape as every other error.
pub(crate) fn parse_json_body<T>(body: Result<Bytes, BytesRejection>) -> Result<T, AppError>
where
    T: DeserializeOwned + Default,
{
    let body = body?;
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }

    serde_json::from_slice(&body)
        .map_err(|e| AppError::InvalidRequest(format!("malformed JSON body: {e}")))
}
