//! Application configuration management.
//!
//! This module handles loading configuration from environment variables.
//! It uses the `envy` crate to deserialize environment variables into a type-safe struct,
//! then validates the values that the lookup engine relies on.

use serde::Deserialize;

/// Errors raised while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An environment variable is missing or cannot be parsed.
    #[error("environment error: {0}")]
    Env(#[from] envy::Error),

    /// A value parsed but is not usable.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Application configuration loaded from environment variables.
///
/// # Environment Variables
///
/// - `ADMIN_API_KEY` (required): admin key seeded into the key store at startup
/// - `DATABASE_URL` (optional): PostgreSQL connection string; keys are kept in memory without it
/// - `PORT` (optional): HTTP server port, defaults to 3000
/// - `DEFAULT_COUNTRY_CODE` (optional): replaces a national leading `0`, defaults to `62`
/// - `GATEWAY_URL` (optional): base URL of the messaging gateway
/// - `DEFAULT_CONCURRENCY` / `MAX_CONCURRENCY` (optional): bulk worker counts
/// - `RECONNECT_DELAY_MS` / `STATUS_POLL_INTERVAL_MS` / `GATEWAY_TIMEOUT_MS` (optional)
/// - `MAX_BODY_BYTES` (optional): request body limit, defaults to 5 MiB
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database_url: Option<String>,

    #[serde(default = "default_port")]
    pub port: u16,

    pub admin_api_key: String,

    #[serde(default = "default_country_code")]
    pub default_country_code: String,

    #[serde(default = "default_gateway_url")]
    pub gateway_url: String,

    #[serde(default = "default_concurrency")]
    pub default_concurrency: usize,

    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,

    #[serde(default = "default_status_poll_interval_ms")]
    pub status_poll_interval_ms: u64,

    #[serde(default = "default_gateway_timeout_ms")]
    pub gateway_timeout_ms: u64,

    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

fn default_port() -> u16 {
    3000
}

fn default_country_code() -> String {
    "62".to_string()
}

fn default_gateway_url() -> String {
    "http://127.0.0.1:8081".to_string()
}

fn default_concurrency() -> usize {
    5
}

fn default_max_concurrency() -> usize {
    50
}

fn default_reconnect_delay_ms() -> u64 {
    3000
}

fn default_status_poll_interval_ms() -> u64 {
    10_000
}

fn default_gateway_timeout_ms() -> u64 {
    15_000
}

fn default_max_body_bytes() -> usize {
    5 * 1024 * 1024
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// This method first attempts to load a `.env` file (which is optional),
    /// then reads environment variables, deserializes them into a Config struct
    /// and validates the result.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Required environment variables are missing (e.g., ADMIN_API_KEY)
    /// - Environment variable values cannot be parsed into expected types
    /// - Parsed values fail [`Config::validate`]
    pub fn from_env() -> Result<Self, ConfigError> {
        // Try to load .env file if it exists (does nothing if not found)
        dotenvy::dotenv().ok();

        // Field names are automatically converted: admin_api_key -> ADMIN_API_KEY
        let config = envy::from_env::<Config>()?;
        config.validate()?;
        Ok(config)
    }

    /// Check values that would otherwise break the lookup engine at runtime.
    ///
    /// The country code must be digits without a leading `0`, otherwise a
    /// normalized number could be rewritten again on a second pass.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.admin_api_key.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "ADMIN_API_KEY must not be empty".to_string(),
            ));
        }

        let code = &self.default_country_code;
        if code.is_empty() || !code.chars().all(|c| c.is_ascii_digit()) || code.starts_with('0') {
            return Err(ConfigError::Invalid(format!(
                "DEFAULT_COUNTRY_CODE must be digits without a leading zero, got {code:?}"
            )));
        }

        if self.default_concurrency == 0 || self.max_concurrency == 0 {
            return Err(ConfigError::Invalid(
                "DEFAULT_CONCURRENCY and MAX_CONCURRENCY must be positive".to_string(),
            ));
        }

        if self.default_concurrency > self.max_concurrency {
            return Err(ConfigError::Invalid(format!(
                "DEFAULT_CONCURRENCY ({}) exceeds MAX_CONCURRENCY ({})",
                self.default_concurrency, self.max_concurrency
            )));
        }

        let parsed = url::Url::parse(&self.gateway_url)
            .map_err(|_| ConfigError::Invalid("GATEWAY_URL is not a valid URL".to_string()))?;
        match parsed.scheme() {
            "http" | "https" => Ok(()),
            other => Err(ConfigError::Invalid(format!(
                "GATEWAY_URL must use http or https, got {other}"
            ))),
        }
    }
}
