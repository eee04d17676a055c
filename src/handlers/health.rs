//! Liveness and health endpoints for service monitoring.

use axum::{Json, extract::State};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Value, json};

use crate::{AppState, error::AppError};

/// Liveness probe: `GET /` → `{"ok": true}`.
pub async fn root() -> Json<Value> {
    Json(json!({ "ok": true }))
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Overall service status
    pub status: String,

    /// Key store connectivity
    pub store: String,

    /// Messaging connection readiness
    pub connection: String,

    /// Current server timestamp
    pub timestamp: DateTime<Utc>,
}

/// Health check handler.
///
/// # Response (200 OK)
///
/// ```json
/// {
///   "status": "healthy",
///   "store": "connected",
///   "connection": "ready",
///   "timestamp": "2025-12-21T19:00:00Z"
/// }
/// ```
///
/// A store failure returns the standard error response. A connection that
/// is not ready degrades the status but still answers 200.
pub async fn health_check(State(state): State<AppState>) -> Result<Json<HealthResponse>, AppError> {
    state.guard.store().ping().await?;

    let ready = state.dispatcher.connection().is_ready();

    Ok(Json(HealthResponse {
        status: if ready { "healthy" } else { "degraded" }.to_string(),
        store: "connected".to_string(),
        connection: if ready { "ready" } else { "not_ready" }.to_string(),
        timestamp: Utc::now(),
    }))
}
