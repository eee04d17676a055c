//! Shared fixtures for router-level tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;

use wa_business_lookup::{
    AppState, build_router,
    connection::{ConnectionError, WhatsAppConnection},
    models::api_key::ApiKeyRecord,
    models::lookup::{BusinessProfile, ContactMetadata},
    services::{dispatcher::BulkDispatcher, guard::ApiKeyGuard},
    store::{ApiKeyStore, MemoryApiKeyStore},
};

pub const ADMIN_KEY: &str = "admin-secret";

/// What the fake session knows about one JID.
#[derive(Clone, Default)]
pub struct Account {
    pub contact: ContactMetadata,
    pub profile: Option<BusinessProfile>,
}

/// In-memory stand-in for a messaging session.
///
/// Numbers not in `accounts` do not exist.
#[derive(Default)]
pub struct FakeConnection {
    pub ready: AtomicBool,
    pub accounts: HashMap<String, Account>,
}

impl FakeConnection {
    pub fn ready() -> Self {
        Self {
            ready: AtomicBool::new(true),
            accounts: HashMap::new(),
        }
    }

    pub fn with_account(mut self, digits: &str, account: Account) -> Self {
        self.accounts
            .insert(format!("{digits}@s.whatsapp.net"), account);
        self
    }
}

#[async_trait]
impl WhatsAppConnection for FakeConnection {
    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    async fn number_exists(&self, jid: &str) -> Result<bool, ConnectionError> {
        Ok(self.accounts.contains_key(jid))
    }

    async fn contact_metadata(&self, jid: &str) -> ContactMetadata {
        self.accounts
            .get(jid)
            .map(|a| a.contact.clone())
            .unwrap_or_default()
    }

    async fn business_profile(
        &self,
        jid: &str,
    ) -> Result<Option<BusinessProfile>, ConnectionError> {
        Ok(self.accounts.get(jid).and_then(|a| a.profile.clone()))
    }
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryApiKeyStore>,
}

/// Body limit used by [`test_app`].
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

pub async fn test_app(connection: FakeConnection) -> TestApp {
    let store = Arc::new(MemoryApiKeyStore::new());
    let guard = ApiKeyGuard::new(store.clone());
    guard.bootstrap_admin(ADMIN_KEY).await.expect("seed admin");

    let connection: Arc<dyn WhatsAppConnection> = Arc::new(connection);
    let dispatcher = BulkDispatcher::new(connection, "62", 5, 50);

    TestApp {
        router: build_router(AppState { guard, dispatcher }, MAX_BODY_BYTES),
        store,
    }
}

pub async fn add_key(store: &MemoryApiKeyStore, key: &str, limit: Option<i64>) {
    store
        .insert(ApiKeyRecord::new(key.to_string(), false, limit))
        .await
        .expect("insert key");
}

pub async fn send(
    router: &Router,
    method: &str,
    uri: &str,
    api_key: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(key) = api_key {
        builder = builder.header("x-api-key", key);
    }

    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("request");

    send_request(router, request).await
}

pub async fn send_request(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}
