//! Data models for stored entities and API request/response types.

/// API key authentication and metering model
pub mod api_key;
/// Phone number lookup model
pub mod lookup;
