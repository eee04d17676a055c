//! WhatsApp business-account lookup service.
//!
//! Classifies phone numbers as business, official or personal WhatsApp
//! accounts behind an API-key-gated HTTP API.
//!
//! # Architecture
//!
//! - **Web Framework**: Axum (async HTTP server)
//! - **Key Store**: PostgreSQL with sqlx, or in memory when no database is configured
//! - **Authentication**: metered API keys with per-key limits, admin keys for key management
//! - **Messaging**: a shared connection handle implementing [`connection::WhatsAppConnection`]
//!
//! # Request Flow
//!
//! 1. `middleware::auth` authorizes the key and charges usage
//! 2. `services::dispatcher` normalizes the numbers and fans them out to workers
//! 3. `services::classifier` turns each number's replies into a verdict
//! 4. Results and the key's usage summary are returned as JSON

pub mod config;
pub mod connection;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod store;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{get, post},
};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::services::{dispatcher::BulkDispatcher, guard::ApiKeyGuard};

/// Shared state handed to every handler and middleware.
#[derive(Clone)]
pub struct AppState {
    pub guard: ApiKeyGuard,
    pub dispatcher: BulkDispatcher,
}

/// Build the HTTP router.
///
/// # Routes
///
/// - Public: `GET /`, `GET /health`
/// - Metered (`x-api-key` header or `apikey` query): `POST /bulk-check`,
///   `GET /bulk-check`, `POST /check`
/// - Admin (`x-api-key` header): `POST /generate-apikey`, `GET /apikeys`,
///   `POST /revoke-apikey`
pub fn build_router(state: AppState, max_body_bytes: usize) -> Router {
    let metered_routes = Router::new()
        .route(
            "/bulk-check",
            post(handlers::lookup::bulk_check_post).get(handlers::lookup::bulk_check_get),
        )
        .route("/check", post(handlers::lookup::check))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::api_key_middleware,
        ));

    let admin_routes = Router::new()
        .route(
            "/generate-apikey",
            post(handlers::api_keys::generate_api_key),
        )
        .route("/apikeys", get(handlers::api_keys::list_api_keys))
        .route("/revoke-apikey", post(handlers::api_keys::revoke_api_key))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::admin_middleware,
        ));

    Router::new()
        .route("/", get(handlers::health::root))
        .route("/health", get(handlers::health::health_check))
        .merge(metered_routes)
        .merge(admin_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(axum_middleware::from_fn_with_state(
                    max_body_bytes,
                    middleware::body_limit::reject_oversized,
                ))
                .layer(DefaultBodyLimit::max(max_body_bytes)),
        )
        .with_state(state)
}
