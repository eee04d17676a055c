//! Messaging connection capability.
//!
//! The lookup engine never owns a protocol session. It receives an
//! `Arc<dyn WhatsAppConnection>` and issues queries through it; session
//! persistence, reconnects and pairing belong to the implementation.
//!
//! Implementations must hand back already-normalized types: whatever shape
//! the underlying protocol replies with is converted at this boundary.

pub mod gateway;
pub mod state;

use async_trait::async_trait;

use crate::models::lookup::{BusinessProfile, ContactMetadata};

pub use gateway::GatewayConnection;
pub use state::{ConnectionEvent, ConnectionState, ConnectionStatus};

/// Failure of a single query against the messaging connection.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("gateway request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("gateway returned status {0}")]
    Status(u16),

    #[error("unexpected gateway reply: {0}")]
    Protocol(String),
}

/// Queries the lookup engine needs from a messaging session.
///
/// All methods take the protocol identity (`<digits>@s.whatsapp.net`).
/// Workers call these concurrently on one shared instance.
#[async_trait]
pub trait WhatsAppConnection: Send + Sync {
    /// Whether the session can currently serve queries.
    fn is_ready(&self) -> bool;

    /// Whether an account is registered for `jid`.
    async fn number_exists(&self, jid: &str) -> Result<bool, ConnectionError>;

    /// Cached contact data for `jid`. Best effort: unknown contacts are empty.
    async fn contact_metadata(&self, jid: &str) -> ContactMetadata;

    /// Business profile for `jid`, `None` when the account has none.
    async fn business_profile(&self, jid: &str)
    -> Result<Option<BusinessProfile>, ConnectionError>;
}
