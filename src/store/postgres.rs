//! PostgreSQL key store.
//!
//! # Atomicity
//!
//! `consume` is one conditional `UPDATE ... RETURNING`: the row lock taken by
//! the update serializes concurrent requests on the same key, and the `WHERE`
//! clause re-checks the limit against the latest committed usage. A key can
//! therefore never be charged past its limit.

use async_trait::async_trait;

use super::{ApiKeyStore, ConsumeOutcome};
use crate::db::DbPool;
use crate::error::AppError;
use crate::models::api_key::ApiKeyRecord;

const RECORD_COLUMNS: &str = "id, key, is_admin, usage, usage_limit, note, user_id, created_by, created_at, last_used_at";

#[derive(Clone)]
pub struct PgApiKeyStore {
    pool: DbPool,
}

impl PgApiKeyStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ApiKeyStore for PgApiKeyStore {
    async fn find(&self, key: &str) -> Result<Option<ApiKeyRecord>, AppError> {
        let record = sqlx::query_as::<_, ApiKeyRecord>(&format!(
            "SELECT {RECORD_COLUMNS} FROM api_keys WHERE key = $1"
        ))
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn consume(&self, key: &str) -> Result<ConsumeOutcome, AppError> {
        // Increment only while under the limit
        let updated = sqlx::query_as::<_, ApiKeyRecord>(&format!(
            r#"
            UPDATE api_keys
            SET usage = usage + 1,
                last_used_at = NOW()
            WHERE key = $1
              AND (is_admin OR usage_limit IS NULL OR usage < usage_limit)
            RETURNING {RECORD_COLUMNS}
            "#
        ))
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(record) = updated {
            return Ok(ConsumeOutcome::Consumed(record));
        }

        // Nothing updated: either the key is unknown or it is at its limit
        Ok(match self.find(key).await? {
            Some(record) => ConsumeOutcome::Exhausted(record),
            None => ConsumeOutcome::UnknownKey,
        })
    }

    async fn insert(&self, record: ApiKeyRecord) -> Result<ApiKeyRecord, AppError> {
        let inserted = sqlx::query_as::<_, ApiKeyRecord>(&format!(
            r#"
            INSERT INTO api_keys (id, key, is_admin, usage, usage_limit, note, user_id, created_by, created_at, last_used_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {RECORD_COLUMNS}
            "#
        ))
        .bind(record.id)
        .bind(&record.key)
        .bind(record.is_admin)
        .bind(record.usage)
        .bind(record.usage_limit)
        .bind(&record.note)
        .bind(&record.user_id)
        .bind(&record.created_by)
        .bind(record.created_at)
        .bind(record.last_used_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(inserted)
    }

    async fn list(&self) -> Result<Vec<ApiKeyRecord>, AppError> {
        let records = sqlx::query_as::<_, ApiKeyRecord>(&format!(
            "SELECT {RECORD_COLUMNS} FROM api_keys ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    async fn delete(&self, key: &str) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM api_keys WHERE key = $1")
            .bind(key)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn ensure_admin(&self, key: &str) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            INSERT INTO api_keys (key, is_admin, usage, usage_limit, note)
            VALUES ($1, true, 0, NULL, 'default-admin')
            ON CONFLICT (key) DO NOTHING
            "#,
        )
        .bind(key)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
