//! API key authentication middleware.
//!
//! Two layers share the same key store:
//! - `api_key_middleware` guards metered lookup routes and charges usage
//! - `admin_middleware` guards key management routes and charges nothing
//!
//! Both reject unauthorized requests before the handler runs and inject an
//! [`AuthContext`] into the request on success.

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

use crate::{AppState, error::AppError, models::api_key::ApiKeyRecord};

/// Header carrying the API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Query parameter carrying the API key on metered routes.
pub const API_KEY_QUERY_PARAM: &str = "apikey";

/// Authentication context attached to authenticated requests.
///
/// Route handlers extract it with `Extension<AuthContext>`.
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// The key record as it was after authorization.
    ///
    /// On metered routes `usage` already includes the current request.
    pub record: ApiKeyRecord,
}

/// Metered authentication middleware.
///
/// # Flow
///
/// 1. Read the key from `x-api-key`, falling back to `?apikey=`
/// 2. Check it against the store and charge one unit of usage
/// 3. Inject `AuthContext` and call the next handler
///
/// # Errors
///
/// - `MissingApiKey` (401), `InvalidApiKey` (403), `QuotaExceeded` (429)
pub async fn api_key_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let key = header_key(request.headers()).or_else(|| query_key(request.uri().query()));

    let record = state.guard.authorize(key.as_deref()).await?;

    request.extensions_mut().insert(AuthContext { record });
    Ok(next.run(request).await)
}

/// Admin authentication middleware.
///
/// Only the `x-api-key` header is accepted here so admin keys do not end up
/// in access logs through query strings.
///
/// # Errors
///
/// - `MissingApiKey` (401), `InvalidApiKey` (403), `AdminRequired` (403)
pub async fn admin_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let key = header_key(request.headers());

    let record = state.guard.authorize_admin(key.as_deref()).await?;

    request.extensions_mut().insert(AuthContext { record });
    Ok(next.run(request).await)
}

fn header_key(headers: &HeaderMap) -> Option<String> {
    headers
        .get(API_KEY_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
}

fn query_key(query: Option<&str>) -> Option<String> {
    url::form_urlencoded::parse(query?.as_bytes())
        .find(|(name, _)| name == API_KEY_QUERY_PARAM)
        .map(|(_, value)| value.trim().to_string())
        .filter(|k| !k.is_empty())
}
