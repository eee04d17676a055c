//! Business lookup service - main application entry point.
//!
//! # Startup Flow
//!
//! 1. Load configuration from environment variables
//! 2. Open the key store (PostgreSQL + migrations, or in memory)
//! 3. Seed the default admin key
//! 4. Connect to the messaging gateway and start its supervisor
//! 5. Build the HTTP router and start serving

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

use wa_business_lookup::{
    AppState, build_router,
    config::Config,
    connection::{GatewayConnection, WhatsAppConnection},
    db,
    services::{dispatcher::BulkDispatcher, guard::ApiKeyGuard},
    store::{ApiKeyStore, MemoryApiKeyStore, PgApiKeyStore},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Reads RUST_LOG (defaults to "info" level)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = Config::from_env()?;
    tracing::info!("Configuration loaded");

    let store: Arc<dyn ApiKeyStore> = match &config.database_url {
        Some(database_url) => {
            let pool = db::create_pool(database_url).await?;
            tracing::info!("Database pool created");

            db::run_migrations(&pool).await?;
            tracing::info!("Database migrations complete");

            Arc::new(PgApiKeyStore::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, API keys are kept in memory and lost on restart");
            Arc::new(MemoryApiKeyStore::new())
        }
    };

    let guard = ApiKeyGuard::new(store);
    guard.bootstrap_admin(&config.admin_api_key).await?;

    let gateway = Arc::new(GatewayConnection::new(
        &config.gateway_url,
        Duration::from_millis(config.gateway_timeout_ms),
    )?);
    Arc::clone(&gateway).spawn_supervisor(
        Duration::from_millis(config.status_poll_interval_ms),
        Duration::from_millis(config.reconnect_delay_ms),
    );
    tracing::info!(gateway = %config.gateway_url, "Messaging gateway supervisor started");

    let connection: Arc<dyn WhatsAppConnection> = gateway;
    let dispatcher = BulkDispatcher::new(
        connection,
        config.default_country_code.clone(),
        config.default_concurrency,
        config.max_concurrency,
    );

    let app = build_router(AppState { guard, dispatcher }, config.max_body_bytes);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Business lookup API listening on {}", addr);
    tracing::info!("Use header 'x-api-key' for authentication");

    axum::serve(listener, app).await?;

    Ok(())
}
