//! API key model for authentication and metering.
//!
//! API keys gate every lookup endpoint. Non-admin keys carry a usage counter
//! and an optional limit; admin keys are never metered against their limit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Limit applied to generated keys when the request omits it or sends garbage.
pub const DEFAULT_KEY_LIMIT: i64 = 100;

/// Represents an API key record from the store.
///
/// # Database Table
///
/// Maps to the `api_keys` table with columns:
/// - `id`: Unique identifier (UUID)
/// - `key`: The opaque token clients send (unique)
/// - `is_admin`: Admin keys may manage other keys and are unmetered
/// - `usage`: Number of metered requests served so far
/// - `usage_limit`: Maximum metered requests, NULL for unlimited
/// - `note`, `user_id`, `created_by`: Free-form ownership metadata
/// - `created_at`, `last_used_at`: Timestamps
#[derive(Debug, Clone, PartialEq, sqlx::FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeyRecord {
    pub id: Uuid,

    pub key: String,

    pub is_admin: bool,

    /// Only ever increases.
    pub usage: i64,

    #[serde(rename = "limit")]
    pub usage_limit: Option<i64>,

    pub note: String,

    pub user_id: String,

    /// Key of the admin that generated this record, if any.
    pub created_by: Option<String>,

    pub created_at: DateTime<Utc>,

    pub last_used_at: Option<DateTime<Utc>>,
}

impl ApiKeyRecord {
    /// Build a fresh, unused record.
    pub fn new(key: String, is_admin: bool, usage_limit: Option<i64>) -> Self {
        Self {
            id: Uuid::new_v4(),
            key,
            is_admin,
            usage: 0,
            usage_limit,
            note: String::new(),
            user_id: String::new(),
            created_by: None,
            created_at: Utc::now(),
            last_used_at: None,
        }
    }

    /// Whether a metered request must be refused for this key.
    ///
    /// Admin keys and keys without a limit are never exhausted.
    pub fn is_exhausted(&self) -> bool {
        !self.is_admin && self.usage_limit.is_some_and(|limit| self.usage >= limit)
    }

    /// Usage summary returned alongside bulk results.
    pub fn usage_info(&self) -> UsageInfo {
        UsageInfo {
            usage: self.usage,
            limit: self.usage_limit,
            remaining: self.usage_limit.map(|limit| (limit - self.usage).max(0)),
        }
    }
}

/// Usage counters as reported to the caller.
///
/// `remaining` is null for unlimited keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageInfo {
    pub usage: i64,
    pub limit: Option<i64>,
    pub remaining: Option<i64>,
}

/// Public fields of a key, as listed to admins.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeySummary {
    pub key: String,
    pub is_admin: bool,
    pub usage: i64,
    pub limit: Option<i64>,
    pub note: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub last_used_at: Option<DateTime<Utc>>,
}

impl From<ApiKeyRecord> for ApiKeySummary {
    fn from(record: ApiKeyRecord) -> Self {
        Self {
            key: record.key,
            is_admin: record.is_admin,
            usage: record.usage,
            limit: record.usage_limit,
            note: record.note,
            user_id: record.user_id,
            created_at: record.created_at,
            last_used_at: record.last_used_at,
        }
    }
}

/// Request body for `POST /generate-apikey`.
///
/// # JSON Example
///
/// ```json
/// {
///   "limit": 500,
///   "note": "reseller batch",
///   "userId": "cust-42"
/// }
/// ```
///
/// `limit` is kept as a raw JSON value so that an explicit `null`
/// (unlimited) can be told apart from an omitted field (default limit).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateApiKeyRequest {
    #[serde(default = "default_limit_value")]
    pub limit: Value,

    #[serde(default)]
    pub note: String,

    #[serde(default)]
    pub user_id: String,
}

impl Default for CreateApiKeyRequest {
    fn default() -> Self {
        Self {
            limit: default_limit_value(),
            note: String::new(),
            user_id: String::new(),
        }
    }
}

fn default_limit_value() -> Value {
    Value::from(DEFAULT_KEY_LIMIT)
}

/// Response body for `POST /generate-apikey`.
///
/// The token is shown here and in admin listings.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateApiKeyResponse {
    pub success: bool,
    pub key: String,
    pub limit: Option<i64>,
    pub note: String,
    pub user_id: String,
}

/// Response body for `GET /apikeys`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ListApiKeysResponse {
    pub success: bool,
    pub keys: Vec<ApiKeySummary>,
}

/// Request body for `POST /revoke-apikey`.
#[derive(Debug, Default, Deserialize)]
pub struct RevokeApiKeyRequest {
    #[serde(default)]
    pub key: Option<String>,
}

/// Response body for `POST /revoke-apikey`.
#[derive(Debug, Serialize, Deserialize)]
pub struct RevokeApiKeyResponse {
    pub success: bool,
    pub revoked: String,
}
