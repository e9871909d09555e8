//! MQTT implementation of the relay's broker seams, on top of `rumqttc`.

pub mod address;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Outgoing, Packet, QoS};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use relay_api::{BrokerConnector, BrokerPublisher, RelayError};

pub use address::{BrokerAddress, DEFAULT_MQTT_PORT};

/// Large enough for a full 64 KiB UDP datagram republished with its topic.
pub const DEFAULT_MAX_PACKET_SIZE: usize = 128 * 1024;

/// Fixed header (1) + remaining length (at most 4) + topic length prefix (2).
const PUBLISH_OVERHEAD: usize = 7;

#[derive(Debug, Clone)]
pub struct MqttSettings {
    pub address: BrokerAddress,
    pub client_id: String,
    /// Zero disables keep-alive, otherwise at least one second.
    pub keep_alive: Duration,
    /// Requests buffered between the publisher and the event loop.
    pub queue_capacity: usize,
    pub reconnect_delay: Duration,
    /// Largest MQTT packet sent or accepted. Larger publishes are dropped
    /// before they reach the client.
    pub max_packet_size: usize,
}

impl MqttSettings {
    pub fn new(address: BrokerAddress, client_id: impl Into<String>) -> Self {
        Self {
            address,
            client_id: client_id.into(),
            keep_alive: Duration::from_secs(30),
            queue_capacity: 1024,
            reconnect_delay: Duration::from_secs(1),
            max_packet_size: DEFAULT_MAX_PACKET_SIZE,
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  Connector
// ═══════════════════════════════════════════════════════════════

/// Opens the one MQTT connection of the process.
///
/// The event loop task lives until `token` is cancelled or the client
/// sends a disconnect. Dropping the `connect` future before the broker
/// acknowledged stops it as well.
pub struct MqttConnector {
    settings: MqttSettings,
    token: CancellationToken,
}

impl MqttConnector {
    pub fn new(settings: MqttSettings, token: CancellationToken) -> Self {
        Self { settings, token }
    }
}

impl BrokerConnector for MqttConnector {
    fn connect(
        &self,
    ) -> Pin<Box<dyn Future<Output = Result<Arc<dyn BrokerPublisher>, RelayError>> + Send + '_>> {
        Box::pin(async move {
            let s = &self.settings;
            tracing::info!(server = %s.address, client_id = %s.client_id, "initialising MQTT connection");

            let mut options = MqttOptions::new(s.client_id.clone(), s.address.host.clone(), s.address.port);
            options.set_keep_alive(s.keep_alive);
            options.set_max_packet_size(s.max_packet_size, s.max_packet_size);
            let (client, event_loop) = AsyncClient::new(options, s.queue_capacity);

            let loop_token = self.token.child_token();
            let (ready_tx, ready_rx) = oneshot::channel();
            tokio::spawn(drive_event_loop(
                event_loop,
                ready_tx,
                s.address.clone(),
                s.reconnect_delay,
                loop_token.clone(),
            ));
            let unready = loop_token.drop_guard();

            ready_rx.await.map_err(|_| {
                RelayError::BrokerUnavailable(format!("{}: stopped before connecting", s.address))
            })?;
            unready.disarm();
            Ok(Arc::new(MqttPublisher {
                client,
                max_packet_size: s.max_packet_size,
            }) as Arc<dyn BrokerPublisher>)
        })
    }
}

/// Poll the event loop forever. The first ConnAck is the readiness
/// signal; errors are retried after `reconnect_delay`.
async fn drive_event_loop(
    mut event_loop: EventLoop,
    ready: oneshot::Sender<()>,
    server: BrokerAddress,
    reconnect_delay: Duration,
    token: CancellationToken,
) {
    let mut ready = Some(ready);
    loop {
        tokio::select! {
            event = event_loop.poll() => match event {
                Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                    tracing::info!(%server, code = ?ack.code, "MQTT connection established");
                    if let Some(tx) = ready.take() {
                        let _ = tx.send(());
                    }
                }
                Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                    tracing::info!(%server, "MQTT disconnect sent");
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(%server, error = %e, "MQTT connection error, retrying");
                    tokio::select! {
                        _ = tokio::time::sleep(reconnect_delay) => {}
                        _ = token.cancelled() => break,
                    }
                }
            },
            _ = token.cancelled() => break,
        }
    }
    tracing::debug!(%server, "MQTT event loop finished");
}

// ═══════════════════════════════════════════════════════════════
//  Publisher
// ═══════════════════════════════════════════════════════════════

/// QoS 0, non-retained, non-blocking publishes.
pub struct MqttPublisher {
    client: AsyncClient,
    max_packet_size: usize,
}

impl BrokerPublisher for MqttPublisher {
    fn publish(&self, topic: &str, payload: &[u8]) {
        // an oversized packet would fail inside the event loop and drop the connection
        let size = PUBLISH_OVERHEAD + topic.len() + payload.len();
        if size > self.max_packet_size {
            tracing::warn!(topic, size, max = self.max_packet_size, "publish too large, dropped");
            return;
        }
        if let Err(e) = self.client.try_publish(topic, QoS::AtMostOnce, false, payload) {
            tracing::warn!(topic, error = %e, "publish not enqueued");
        }
    }

    fn disconnect(&self) {
        if let Err(e) = self.client.try_disconnect() {
            tracing::debug!(error = %e, "disconnect not enqueued");
        }
    }
}
