//! Number lookup HTTP handlers.
//!
//! This module implements the metered endpoints:
//! - POST /bulk-check - Classify a JSON array of numbers
//! - GET /bulk-check - Classify comma-separated numbers from the query string
//! - POST /check - Classify a single number
//!
//! All of them run behind `api_key_middleware`, so the request has already
//! been charged to the caller's key when a handler starts.

use std::time::Instant;

use axum::{
    Extension, Json,
    body::Bytes,
    extract::{RawQuery, State, rejection::BytesRejection},
};
use serde_json::Value;

use super::parse_json_body;
use crate::{
    AppState,
    error::AppError,
    middleware::auth::AuthContext,
    models::lookup::{BulkCheckQuery, BulkCheckRequest, BulkCheckResponse, CheckRequest, CheckResponse},
    services::classifier,
};

/// Classify a batch of numbers.
///
/// # Request Body
///
/// ```json
/// {
///   "numbers": ["081234567890", "+62 812 9999 0000"],
///   "concurrency": 5
/// }
/// ```
///
/// # Response
///
/// ```json
/// {
///   "took_ms": 812,
///   "results": [
///     {"number": "6281234567890", "exists": false, "type": "not_on_whatsapp"}
///   ],
///   "usage": {"usage": 4, "limit": 100, "remaining": 96}
/// }
/// ```
///
/// # Errors
///
/// - **400**: `numbers` missing, empty or not an array
/// - **500**: messaging connection not ready
pub async fn bulk_check_post(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<BulkCheckResponse>, AppError> {
    ensure_ready(&state)?;

    let request: BulkCheckRequest = parse_json_body(body)?;
    let numbers = match request.numbers {
        Some(Value::Array(numbers)) if !numbers.is_empty() => numbers,
        _ => return Err(AppError::InvalidRequest("numbers array required".to_string())),
    };

    let concurrency = state
        .dispatcher
        .coerce_concurrency(request.concurrency.as_ref());

    Ok(Json(run_bulk(&state, &auth, &numbers, concurrency).await))
}

/// Classify numbers passed as `?numbers=a,b,c&concurrency=N`.
///
/// `numbers` may also be repeated (`?numbers=a&numbers=b`). Same response
/// shape as the POST variant.
pub async fn bulk_check_get(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    RawQuery(query): RawQuery,
) -> Result<Json<BulkCheckResponse>, AppError> {
    ensure_ready(&state)?;

    let query = BulkCheckQuery::parse(query.as_deref());
    let numbers: Vec<Value> = query.numbers.into_iter().map(Value::String).collect();

    if numbers.is_empty() {
        return Err(AppError::InvalidRequest(
            "numbers query param required".to_string(),
        ));
    }

    let concurrency = state
        .dispatcher
        .coerce_concurrency(query.concurrency.map(Value::String).as_ref());

    Ok(Json(run_bulk(&state, &auth, &numbers, concurrency).await))
}

/// Classify one number.
///
/// # Request Body
///
/// ```json
/// { "number": "081234567890" }
/// ```
///
/// Input without any digits is answered with a result carrying
/// `"error": "invalid_number"` rather than a 400.
pub async fn check(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<CheckResponse>, AppError> {
    ensure_ready(&state)?;

    let request: CheckRequest = parse_json_body(body)?;
    let raw = match request.number {
        Some(Value::String(s)) if !s.trim().is_empty() => s,
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Null) | None | Some(Value::String(_)) => {
            return Err(AppError::InvalidRequest("number required".to_string()));
        }
        Some(other) => other.to_string(),
    };

    let result = classifier::check_single(
        state.dispatcher.connection().as_ref(),
        &raw,
        state.dispatcher.country_code(),
    )
    .await;

    Ok(Json(CheckResponse { result }))
}

fn ensure_ready(state: &AppState) -> Result<(), AppError> {
    if state.dispatcher.connection().is_ready() {
        Ok(())
    } else {
        Err(AppError::SocketNotReady)
    }
}

async fn run_bulk(
    state: &AppState,
    auth: &AuthContext,
    numbers: &[Value],
    concurrency: usize,
) -> BulkCheckResponse {
    let start = Instant::now();
    let results = state.dispatcher.run(numbers, concurrency).await;
    let took_ms = start.elapsed().as_millis() as u64;

    tracing::info!(
        requested = numbers.len(),
        results = results.len(),
        concurrency,
        took_ms,
        "bulk check served"
    );

    BulkCheckResponse {
        took_ms,
        results,
        usage: auth.record.usage_info(),
    }
}
