//! API key guard.
//!
//! Authorizes and meters requests against an [`ApiKeyStore`] and implements
//! the admin-only key lifecycle (generate, list, revoke).
//!
//! # Authorization
//!
//! | situation                                   | outcome            |
//! |---------------------------------------------|--------------------|
//! | no key                                      | 401 `missing_key`  |
//! | key not in store                            | 403 `invalid_key`  |
//! | non-admin key with `usage >= limit`         | 429 `quota_exceeded` |
//! | otherwise                                   | usage + 1          |
//!
//! Admin authorization reuses the first two rows, then requires `is_admin`
//! and never touches usage.

use std::sync::Arc;

use serde_json::Value;

use crate::error::AppError;
use crate::models::api_key::{
    ApiKeyRecord, ApiKeySummary, CreateApiKeyRequest, CreateApiKeyResponse, DEFAULT_KEY_LIMIT,
};
use crate::store::{ApiKeyStore, ConsumeOutcome};

/// Random bytes per generated key (192 bits).
const KEY_BYTES: usize = 24;

#[derive(Clone)]
pub struct ApiKeyGuard {
    store: Arc<dyn ApiKeyStore>,
}

impl ApiKeyGuard {
    pub fn new(store: Arc<dyn ApiKeyStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn ApiKeyStore> {
        &self.store
    }

    /// Authorize a metered request and charge it to the key.
    ///
    /// Returns the record with usage already incremented.
    pub async fn authorize(&self, key: Option<&str>) -> Result<ApiKeyRecord, AppError> {
        let key = present(key)?;

        match self.store.consume(key).await? {
            ConsumeOutcome::Consumed(record) => Ok(record),
            ConsumeOutcome::Exhausted(record) => {
                tracing::info!(
                    key = %mask(key),
                    usage = record.usage,
                    limit = ?record.usage_limit,
                    "quota exceeded"
                );
                Err(AppError::QuotaExceeded)
            }
            ConsumeOutcome::UnknownKey => Err(AppError::InvalidApiKey),
        }
    }

    /// Authorize an admin request. Usage is not charged.
    pub async fn authorize_admin(&self, key: Option<&str>) -> Result<ApiKeyRecord, AppError> {
        let key = present(key)?;

        let record = self
            .store
            .find(key)
            .await?
            .ok_or(AppError::InvalidApiKey)?;

        if !record.is_admin {
            return Err(AppError::AdminRequired);
        }

        Ok(record)
    }

    /// Generate a new non-admin key on behalf of `admin`.
    pub async fn create_key(
        &self,
        admin: &ApiKeyRecord,
        request: CreateApiKeyRequest,
    ) -> Result<CreateApiKeyResponse, AppError> {
        let limit = resolve_limit(&request.limit);

        let mut record = ApiKeyRecord::new(generate_api_key(), false, limit);
        record.note = request.note;
        record.user_id = request.user_id;
        record.created_by = Some(admin.key.clone());

        let record = self.store.insert(record).await?;
        tracing::info!(
            key = %mask(&record.key),
            limit = ?record.usage_limit,
            user_id = %record.user_id,
            "api key generated"
        );

        Ok(CreateApiKeyResponse {
            success: true,
            key: record.key,
            limit: record.usage_limit,
            note: record.note,
            user_id: record.user_id,
        })
    }

    /// Every key, admin keys included.
    pub async fn list_keys(&self) -> Result<Vec<ApiKeySummary>, AppError> {
        let records = self.store.list().await?;
        Ok(records.into_iter().map(Into::into).collect())
    }

    /// Delete `key`.
    ///
    /// # Errors
    ///
    /// - `KeyNotFound` when no record matches exactly
    pub async fn revoke_key(&self, key: &str) -> Result<(), AppError> {
        if !self.store.delete(key).await? {
            return Err(AppError::KeyNotFound);
        }
        tracing::info!(key = %mask(key), "api key revoked");
        Ok(())
    }

    /// Seed the configured admin key if the store lacks it.
    pub async fn bootstrap_admin(&self, admin_key: &str) -> Result<(), AppError> {
        if self.store.ensure_admin(admin_key).await? {
            tracing::info!(key = %mask(admin_key), "default admin api key created");
        } else {
            tracing::info!(key = %mask(admin_key), "default admin api key exists");
        }
        Ok(())
    }
}

fn present(key: Option<&str>) -> Result<&str, AppError> {
    key.map(str::trim)
        .filter(|k| !k.is_empty())
        .ok_or(AppError::MissingApiKey)
}

/// Limit for a generated key.
///
/// `null` means unlimited; a non-negative integer is taken as is; anything
/// else falls back to [`DEFAULT_KEY_LIMIT`].
pub fn resolve_limit(value: &Value) -> Option<i64> {
    if value.is_null() {
        return None;
    }

    let limit = value.as_i64().or_else(|| {
        value
            .as_f64()
            .filter(|f| f.fract() == 0.0 && *f <= i64::MAX as f64)
            .map(|f| f as i64)
    });

    match limit {
        Some(n) if n >= 0 => Some(n),
        _ => Some(DEFAULT_KEY_LIMIT),
    }
}

/// Generate an opaque API key: 24 random bytes, hex encoded (48 chars).
pub fn generate_api_key() -> String {
    let bytes: [u8; KEY_BYTES] = rand::random();
    hex::encode(bytes)
}

/// Short form of a key for logs.
fn mask(key: &str) -> String {
    let prefix: String = key.chars().take(4).collect();
    format!("{prefix}***")
}
