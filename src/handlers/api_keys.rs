//! Admin HTTP handlers for API key management.
//!
//! This module provides the endpoints admins use to issue, inspect and
//! revoke keys for other users. All of them run behind `admin_middleware`.

use axum::{
    Extension, Json,
    body::Bytes,
    extract::{State, rejection::BytesRejection},
};

use super::parse_json_body;
use crate::{
    AppState,
    error::AppError,
    middleware::auth::AuthContext,
    models::api_key::{
        CreateApiKeyRequest, CreateApiKeyResponse, ListApiKeysResponse, RevokeApiKeyRequest,
        RevokeApiKeyResponse,
    },
};

/// Generate a new metered key.
///
/// # Request Body
///
/// ```json
/// {
///   "limit": 100,      // null for unlimited, defaults to 100
///   "note": "trial",
///   "userId": "cust-42"
/// }
/// ```
///
/// # Response
///
/// ```json
/// {
///   "success": true,
///   "key": "9f2c...e1",
///   "limit": 100,
///   "note": "trial",
///   "userId": "cust-42"
/// }
/// ```
pub async fn generate_api_key(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<CreateApiKeyResponse>, AppError> {
    let request: CreateApiKeyRequest = parse_json_body(body)?;
    let created = state.guard.create_key(&auth.record, request).await?;

    Ok(Json(created))
}

/// List every key, admin keys included, newest first.
pub async fn list_api_keys(
    State(state): State<AppState>,
) -> Result<Json<ListApiKeysResponse>, AppError> {
    let keys = state.guard.list_keys().await?;

    Ok(Json(ListApiKeysResponse {
        success: true,
        keys,
    }))
}

/// Revoke a key.
///
/// # Request Body
///
/// ```json
/// { "key": "9f2c...e1" }
/// ```
///
/// # Errors
///
/// - **400**: `key` missing
/// - **404**: `key_not_found`
pub async fn revoke_api_key(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<RevokeApiKeyResponse>, AppError> {
    let request: RevokeApiKeyRequest = parse_json_body(body)?;
    let key = request
        .key
        .filter(|k| !k.is_empty())
        .ok_or_else(|| AppError::InvalidRequest("key required".to_string()))?;

    state.guard.revoke_key(&key).await?;

    Ok(Json(RevokeApiKeyResponse {
        success: true,
        revoked: key,
    }))
}
