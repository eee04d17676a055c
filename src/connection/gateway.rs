//! HTTP client for a messaging gateway sidecar.
//!
//! The gateway holds the actual protocol session and exposes it over HTTP:
//!
//! - `GET /status` → `{"connection": "open" | "connecting" | "close", "loggedOut": bool}`
//! - `GET /on-whatsapp/{jid}` → `[{"exists": bool, ...}]` or `{"exists": bool, ...}`
//! - `GET /contacts/{jid}` → contact metadata, 404 when not cached
//! - `GET /business-profile/{jid}` → business profile, 404 or `null` when absent
//!
//! A supervisor task polls `/status` and drives the [`ConnectionState`] machine.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use tokio::task::JoinHandle;
use url::Url;

use super::state::{ConnectionEvent, ConnectionState, ConnectionStatus};
use super::{ConnectionError, WhatsAppConnection};
use crate::models::lookup::{BusinessProfile, ContactMetadata};

/// Session status as reported by the gateway.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayStatus {
    pub connection: String,

    #[serde(default)]
    pub logged_out: bool,
}

impl GatewayStatus {
    fn event(&self) -> ConnectionEvent {
        if self.logged_out {
            return ConnectionEvent::LoggedOut;
        }
        match self.connection.as_str() {
            "open" => ConnectionEvent::Opened,
            "connecting" => ConnectionEvent::Connect,
            _ => ConnectionEvent::Closed,
        }
    }
}

/// Existence reply; some protocol versions wrap it in an array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OnWhatsAppReply {
    Many(Vec<OnWhatsAppEntry>),
    One(OnWhatsAppEntry),
}

#[derive(Debug, Deserialize)]
struct OnWhatsAppEntry {
    #[serde(default)]
    exists: bool,
}

impl OnWhatsAppReply {
    fn exists(&self) -> bool {
        match self {
            OnWhatsAppReply::Many(entries) => entries.first().is_some_and(|e| e.exists),
            OnWhatsAppReply::One(entry) => entry.exists,
        }
    }
}

pub struct GatewayConnection {
    client: reqwest::Client,
    base_url: Url,
    status: ConnectionStatus,
}

impl GatewayConnection {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ConnectionError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| ConnectionError::Protocol(format!("invalid gateway URL: {e}")))?;
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url,
            status: ConnectionStatus::new(),
        })
    }

    pub fn status(&self) -> &ConnectionStatus {
        &self.status
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ConnectionError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ConnectionError::Protocol("gateway URL cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Ask the gateway for the session status.
    pub async fn probe(&self) -> Result<GatewayStatus, ConnectionError> {
        let response = self.client.get(self.endpoint(&["status"])?).send().await?;
        if !response.status().is_success() {
            return Err(ConnectionError::Status(response.status().as_u16()));
        }
        Ok(response.json::<GatewayStatus>().await?)
    }

    /// Probe once and feed the result into the state machine.
    pub async fn refresh(&self) -> ConnectionState {
        if self.status.current() == ConnectionState::Disconnected {
            self.status.apply(ConnectionEvent::Connect);
        }

        match self.probe().await {
            Ok(status) => self.status.apply(status.event()),
            Err(e) => {
                tracing::warn!(error = %e, "gateway status probe failed");
                self.status.apply(ConnectionEvent::Closed)
            }
        }
    }

    /// Keep the connection state current until the session is logged out.
    ///
    /// Polls every `poll_interval` while connected and waits `reconnect_delay`
    /// before retrying after a close.
    pub fn spawn_supervisor(
        self: Arc<Self>,
        poll_interval: Duration,
        reconnect_delay: Duration,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                let state = self.refresh().await;

                let delay = match state {
                    ConnectionState::LoggedOut => {
                        tracing::warn!("messaging session logged out, re-pairing required");
                        return;
                    }
                    ConnectionState::Disconnected => {
                        tracing::info!(
                            delay_ms = reconnect_delay.as_millis() as u64,
                            "messaging connection closed, reconnecting"
                        );
                        reconnect_delay
                    }
                    ConnectionState::Connecting | ConnectionState::Ready => poll_interval,
                };

                tokio::time::sleep(delay).await;
            }
        })
    }
}

#[async_trait]
impl WhatsAppConnection for GatewayConnection {
    fn is_ready(&self) -> bool {
        self.status.current().is_ready()
    }

    async fn number_exists(&self, jid: &str) -> Result<bool, ConnectionError> {
        let response = self
            .client
            .get(self.endpoint(&["on-whatsapp", jid])?)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ConnectionError::Status(response.status().as_u16()));
        }

        let reply = response.json::<Option<OnWhatsAppReply>>().await?;
        Ok(reply.is_some_and(|r| r.exists()))
    }

    async fn contact_metadata(&self, jid: &str) -> ContactMetadata {
        let url = match self.endpoint(&["contacts", jid]) {
            Ok(url) => url,
            Err(_) => return ContactMetadata::default(),
        };

        let response = match self.client.get(url).send().await {
            Ok(response) if response.status().is_success() => response,
            Ok(_) => return ContactMetadata::default(),
            Err(e) => {
                tracing::debug!(jid, error = %e, "contact lookup failed");
                return ContactMetadata::default();
            }
        };

        match response.json::<Option<ContactMetadata>>().await {
            Ok(contact) => contact.unwrap_or_default(),
            Err(e) => {
                tracing::debug!(jid, error = %e, "contact reply did not parse");
                ContactMetadata::default()
            }
        }
    }

    async fn business_profile(
        &self,
        jid: &str,
    ) -> Result<Option<BusinessProfile>, ConnectionError> {
        let response = self
            .client
            .get(self.endpoint(&["business-profile", jid])?)
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                Ok(response.json::<Option<BusinessProfile>>().await?)
            }
            status => Err(ConnectionError::Status(status.as_u16())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn existence_reply_accepts_both_shapes() {
        let many: OnWhatsAppReply =
            serde_json::from_str(r#"[{"exists": true, "jid": "62812@s.whatsapp.net"}]"#).unwrap();
        assert!(many.exists());

        let one: OnWhatsAppReply = serde_json::from_str(r#"{"exists": true}"#).unwrap();
        assert!(one.exists());

        let empty: OnWhatsAppReply = serde_json::from_str("[]").unwrap();
        assert!(!empty.exists());
    }

    #[test]
    fn status_maps_to_events() {
        let open = GatewayStatus { connection: "open".to_string(), logged_out: false };
        assert_eq!(open.event(), ConnectionEvent::Opened);

        let closed = GatewayStatus { connection: "close".to_string(), logged_out: true };
        assert_eq!(closed.event(), ConnectionEvent::LoggedOut);
    }

    #[test]
    fn endpoint_keeps_base_path() {
        let gateway =
            GatewayConnection::new("http://localhost:8081/wa/", Duration::from_secs(1)).unwrap();
        let url = gateway.endpoint(&["on-whatsapp", "62812@s.whatsapp.net"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8081/wa/on-whatsapp/62812@s.whatsapp.net");
    }
}
