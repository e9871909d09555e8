use std::time::Duration;

use tokio_util::sync::CancellationToken;

use broker_mqtt::MqttConnector;
use relay_engine::Relay;

use crate::config::Effective;
use crate::error::ServerError;

/// Time given to the MQTT client to flush its DISCONNECT.
const DISCONNECT_GRACE: Duration = Duration::from_millis(500);

pub async fn run(eff: Effective) -> Result<(), ServerError> {
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "udp-mqtt-relay starting");

    // relay loop and broker event loop stop separately: the broker has to
    // outlive the relay long enough to send DISCONNECT
    let relay_token = CancellationToken::new();
    let broker_token = CancellationToken::new();

    let connector = MqttConnector::new(eff.mqtt.clone(), broker_token.clone());
    let relay = Relay::new(eff.relay_settings());

    let running = tokio::select! {
        started = relay.start(&connector) => match started {
            Ok(running) => running,
            Err(e) => {
                broker_token.cancel();
                return Err(e.into());
            }
        },
        signal = tokio::signal::ctrl_c() => {
            broker_token.cancel();
            signal?;
            tracing::info!("interrupted before ready");
            return Ok(());
        }
    };

    let relay_handle = tokio::spawn(running.run(relay_token.clone()));

    // --- Ожидание Ctrl+C ---
    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down...");
    relay_token.cancel();

    match relay_handle.await {
        Ok(publisher) => {
            publisher.disconnect();
            tokio::time::sleep(DISCONNECT_GRACE).await;
        }
        Err(e) => tracing::error!(error = %e, "relay task failed"),
    }
    broker_token.cancel();

    tracing::info!("shutdown complete");
    Ok(())
}
