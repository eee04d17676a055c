//! HTTP middleware components.
//!
//! Middleware run before route handlers and short-circuit requests that
//! fail authentication or quota checks.

/// API key authentication middleware
pub mod auth;
/// Request body size check
pub mod body_limit;
