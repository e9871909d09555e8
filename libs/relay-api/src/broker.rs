use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::error::RelayError;

/// Handle to an established broker connection.
///
/// `publish` is fire-and-forget: it returns as soon as the message is
/// handed to the client and reports neither delivery nor backpressure.
pub trait BrokerPublisher: Send + Sync {
    fn publish(&self, topic: &str, payload: &[u8]);

    /// Ask the client to close the connection. Default: nothing to do.
    fn disconnect(&self) {}
}

/// Opens the single broker connection.
///
/// The returned future resolves once the broker has acknowledged the
/// connection; that is the broker's readiness signal.
pub trait BrokerConnector: Send + Sync {
    fn connect(
        &self,
    ) -> Pin<Box<dyn Future<Output = Result<Arc<dyn BrokerPublisher>, RelayError>> + Send + '_>>;
}
