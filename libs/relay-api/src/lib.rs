//! Shared types for the UDP → broker relay: the inbound record model,
//! the translator, and the broker seams implemented by transport plugins.

pub mod broker;
pub mod error;
pub mod record;

pub use broker::{BrokerConnector, BrokerPublisher};
pub use error::{MalformedReason, RelayError};
pub use record::{ParseOutcome, ParsedRecord, translate};
