//! Early request-size check.
//!
//! Runs outside the auth layers, so a body that declares a `Content-Length`
//! above the limit is refused before any key is charged. Bodies without the
//! header are still capped by `DefaultBodyLimit` while the handler buffers them.

use axum::{
    extract::{Request, State},
    http::header::CONTENT_LENGTH,
    middleware::Next,
    response::Response,
};

use crate::error::AppError;

pub async fn reject_oversized(
    State(max_body_bytes): State<usize>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let declared = request
        .headers()
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());

    if declared.is_some_and(|len| len > max_body_bytes as u64) {
        tracing::info!(declared = ?declared, max_body_bytes, "request body too large");
        return Err(AppError::PayloadTooLarge);
    }

    Ok(next.run(request).await)
}
