//! In-process key store.
//!
//! Keys live in a `HashMap` behind one async mutex, so every operation,
//! including the limit check plus increment in `consume`, is a single
//! critical section. Nothing survives a restart.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use super::{ApiKeyStore, ConsumeOutcome};
use crate::error::AppError;
use crate::models::api_key::ApiKeyRecord;

#[derive(Clone, Default)]
pub struct MemoryApiKeyStore {
    records: Arc<Mutex<HashMap<String, ApiKeyRecord>>>,
}

impl MemoryApiKeyStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ApiKeyStore for MemoryApiKeyStore {
    async fn find(&self, key: &str) -> Result<Option<ApiKeyRecord>, AppError> {
        Ok(self.records.lock().await.get(key).cloned())
    }

    async fn consume(&self, key: &str) -> Result<ConsumeOutcome, AppError> {
        let mut records = self.records.lock().await;
        let Some(record) = records.get_mut(key) else {
            return Ok(ConsumeOutcome::UnknownKey);
        };

        if record.is_exhausted() {
            return Ok(ConsumeOutcome::Exhausted(record.clone()));
        }

        record.usage += 1;
        record.last_used_at = Some(Utc::now());
        Ok(ConsumeOutcome::Consumed(record.clone()))
    }

    async fn insert(&self, record: ApiKeyRecord) -> Result<ApiKeyRecord, AppError> {
        let mut records = self.records.lock().await;
        if records.contains_key(&record.key) {
            return Err(AppError::InvalidRequest("key already exists".to_string()));
        }
        records.insert(record.key.clone(), record.clone());
        Ok(record)
    }

    async fn list(&self) -> Result<Vec<ApiKeyRecord>, AppError> {
        let mut all: Vec<ApiKeyRecord> = self.records.lock().await.values().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(all)
    }

    async fn delete(&self, key: &str) -> Result<bool, AppError> {
        Ok(self.records.lock().await.remove(key).is_some())
    }

    async fn ensure_admin(&self, key: &str) -> Result<bool, AppError> {
        let mut records = self.records.lock().await;
        if records.contains_key(key) {
            return Ok(false);
        }
        let mut record = ApiKeyRecord::new(key.to_string(), true, None);
        record.note = "default-admin".to_string();
        records.insert(key.to_string(), record);
        Ok(true)
    }

    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn consume_stops_at_limit() {
        let store = MemoryApiKeyStore::new();
        store
            .insert(ApiKeyRecord::new("k".to_string(), false, Some(2)))
            .await
            .unwrap();

        assert!(matches!(store.consume("k").await.unwrap(), ConsumeOutcome::Consumed(r) if r.usage == 1));
        assert!(matches!(store.consume("k").await.unwrap(), ConsumeOutcome::Consumed(r) if r.usage == 2));
        assert!(matches!(store.consume("k").await.unwrap(), ConsumeOutcome::Exhausted(r) if r.usage == 2));
        assert_eq!(store.consume("other").await.unwrap(), ConsumeOutcome::UnknownKey);
    }

    #[tokio::test]
    async fn ensure_admin_is_idempotent() {
        let store = MemoryApiKeyStore::new();
        assert!(store.ensure_admin("root").await.unwrap());
        assert!(!store.ensure_admin("root").await.unwrap());

        let admin = store.find("root").await.unwrap().unwrap();
        assert!(admin.is_admin);
        assert_eq!(admin.usage_limit, None);
    }

    #[tokio::test]
    async fn duplicate_insert_is_rejected() {
        let store = MemoryApiKeyStore::new();
        let record = ApiKeyRecord::new("dup".to_string(), false, None);
        store.insert(record.clone()).await.unwrap();
        assert!(store.insert(record).await.is_err());
    }

    #[tokio::test]
    async fn delete_reports_whether_removed() {
        let store = MemoryApiKeyStore::new();
        store
            .insert(ApiKeyRecord::new("gone".to_string(), false, None))
            .await
            .unwrap();
        assert!(store.delete("gone").await.unwrap());
        assert!(!store.delete("gone").await.unwrap());
    }
}
