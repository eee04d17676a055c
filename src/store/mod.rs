//! API key persistence.
//!
//! The guard only depends on the [`ApiKeyStore`] contract. `PgApiKeyStore`
//! backs it with PostgreSQL; `MemoryApiKeyStore` keeps keys in process and is
//! used when no database is configured.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;

use crate::error::AppError;
use crate::models::api_key::ApiKeyRecord;

pub use memory::MemoryApiKeyStore;
pub use postgres::PgApiKeyStore;

/// Result of trying to charge one metered request to a key.
#[derive(Debug, Clone, PartialEq)]
pub enum ConsumeOutcome {
    /// Usage was incremented; carries the updated record.
    Consumed(ApiKeyRecord),
    /// The key is at its limit; usage is unchanged.
    Exhausted(ApiKeyRecord),
    /// No record has this key.
    UnknownKey,
}

#[async_trait]
pub trait ApiKeyStore: Send + Sync {
    async fn find(&self, key: &str) -> Result<Option<ApiKeyRecord>, AppError>;

    /// Check the limit and increment usage as one atomic step.
    ///
    /// Implementations must never let usage of a non-admin key pass its limit,
    /// however many callers race on the same key.
    async fn consume(&self, key: &str) -> Result<ConsumeOutcome, AppError>;

    async fn insert(&self, record: ApiKeyRecord) -> Result<ApiKeyRecord, AppError>;

    /// All records, newest first.
    async fn list(&self) -> Result<Vec<ApiKeyRecord>, AppError>;

    /// Delete by exact key. Returns whether a record was removed.
    async fn delete(&self, key: &str) -> Result<bool, AppError>;

    /// Create an unlimited admin record for `key` unless one exists.
    /// Returns whether a record was created.
    async fn ensure_admin(&self, key: &str) -> Result<bool, AppError>;

    /// Cheap connectivity check for the health endpoint.
    async fn ping(&self) -> Result<(), AppError>;
}
