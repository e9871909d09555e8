use std::net::SocketAddr;
use std::time::Duration;

/// Why an inbound datagram was rejected by `translate`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MalformedReason {
    #[error("empty payload")]
    Empty,

    #[error("empty topic")]
    EmptyTopic,

    #[error("payload is not valid UTF-8: {0}")]
    Decode(#[from] std::str::Utf8Error),
}

/// Errors surfaced by relay components outside the per-message path.
///
/// Per-message failures never become a `RelayError`: they are counted
/// and dropped.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("receive: {0}")]
    Receive(#[source] std::io::Error),

    #[error("broker address '{0}' is not supported")]
    BrokerAddress(String),

    #[error("broker unavailable: {0}")]
    BrokerUnavailable(String),

    #[error("dependencies not ready after {0:?}")]
    ReadyTimeout(Duration),
}
