//! Business logic services.
//!
//! Services contain the lookup engine and key metering, separated from HTTP handlers.

pub mod classifier;
pub mod dispatcher;
pub mod guard;
pub mod normalizer;
