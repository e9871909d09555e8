use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use relay_api::{BrokerConnector, BrokerPublisher, ParseOutcome, RelayError, translate};

use crate::heartbeat::{
    DEFAULT_HEARTBEAT_INTERVAL, DEFAULT_STATS_PREFIX, HeartbeatScheduler, TelemetryTopics,
};
use crate::listener::{DatagramListener, DatagramSource};
use crate::ready::await_ready;
use crate::stats::{StatsAggregator, saturating_millis};

/// Pause before reading again after a failed receive.
pub const RECEIVE_RETRY_DELAY: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayState {
    Initializing,
    WaitingForReady,
    Running,
}

#[derive(Debug, Clone)]
pub struct RelaySettings {
    pub listen_addr: SocketAddr,
    pub heartbeat_interval: Duration,
    pub stats_prefix: String,
    /// `None` waits for the listener and the broker forever.
    pub ready_timeout: Option<Duration>,
}

impl RelaySettings {
    pub fn new(listen_addr: SocketAddr) -> Self {
        Self {
            listen_addr,
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            stats_prefix: DEFAULT_STATS_PREFIX.to_string(),
            ready_timeout: None,
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  Relay — Initializing → WaitingForReady
// ═══════════════════════════════════════════════════════════════

/// Relay before its dependencies are up.
pub struct Relay {
    settings: RelaySettings,
    stats: StatsAggregator,
    state: watch::Sender<RelayState>,
}

impl Relay {
    pub fn new(settings: RelaySettings) -> Self {
        let (state, _) = watch::channel(RelayState::Initializing);
        Self {
            settings,
            stats: StatsAggregator::new(),
            state,
        }
    }

    pub fn state(&self) -> watch::Receiver<RelayState> {
        self.state.subscribe()
    }

    /// Bind the listener and connect the broker concurrently. Returns
    /// once both are ready; no datagram is read before that.
    pub async fn start(self, connector: &dyn BrokerConnector) -> Result<RunningRelay, RelayError> {
        let Relay { settings, stats, state } = self;
        state.send_replace(RelayState::WaitingForReady);

        let (listener, publisher) = await_ready(
            DatagramListener::bind(settings.listen_addr),
            connector.connect(),
            settings.ready_timeout,
        )
        .await?;

        let heartbeat = HeartbeatScheduler::new(
            settings.heartbeat_interval,
            TelemetryTopics::with_prefix(&settings.stats_prefix),
        );
        state.send_replace(RelayState::Running);
        tracing::info!(
            listen = %listener.local_addr(),
            heartbeat_ms = saturating_millis(settings.heartbeat_interval),
            "service ready"
        );

        Ok(RunningRelay {
            listener,
            publisher,
            stats,
            heartbeat,
            state,
        })
    }
}

// ═══════════════════════════════════════════════════════════════
//  RunningRelay — Running
// ═══════════════════════════════════════════════════════════════

pub struct RunningRelay {
    listener: DatagramListener,
    publisher: Arc<dyn BrokerPublisher>,
    stats: StatsAggregator,
    heartbeat: HeartbeatScheduler,
    state: watch::Sender<RelayState>,
}

impl RunningRelay {
    pub fn local_addr(&self) -> SocketAddr {
        self.listener.local_addr()
    }

    /// Relay datagrams and publish heartbeats until `token` is cancelled.
    pub async fn run(self, token: CancellationToken) -> Arc<dyn BrokerPublisher> {
        let RunningRelay {
            mut listener,
            publisher,
            mut stats,
            mut heartbeat,
            state: _state,
        } = self;

        relay_loop(&mut listener, &mut stats, &mut heartbeat, &*publisher, &token).await;

        tracing::info!("relay stopped");
        publisher
    }
}

/// Datagram handling and heartbeat ticks share this one task, so the
/// counters need no lock. A failed receive pauses reading for
/// [`RECEIVE_RETRY_DELAY`]; heartbeats keep firing meanwhile.
pub async fn relay_loop<S: DatagramSource>(
    source: &mut S,
    stats: &mut StatsAggregator,
    heartbeat: &mut HeartbeatScheduler,
    publisher: &dyn BrokerPublisher,
    token: &CancellationToken,
) {
    let retry = tokio::time::sleep(Duration::ZERO);
    tokio::pin!(retry);
    let mut receive_failed = false;

    loop {
        tokio::select! {
            received = source.recv(), if !receive_failed => match received {
                Ok(payload) => relay_datagram(payload, stats, publisher),
                Err(e) => {
                    tracing::warn!(error = %e, "datagram receive failed");
                    receive_failed = true;
                    retry.as_mut().reset(Instant::now() + RECEIVE_RETRY_DELAY);
                }
            },
            _ = &mut retry, if receive_failed => {
                receive_failed = false;
            }
            _ = heartbeat.tick() => {
                heartbeat.fire(stats, publisher);
            }
            _ = token.cancelled() => break,
        }
    }
}

/// Datagram handler: translate, then publish or count as bad.
pub fn relay_datagram(payload: &[u8], stats: &mut StatsAggregator, publisher: &dyn BrokerPublisher) {
    match translate(payload) {
        ParseOutcome::Ok(record) => {
            stats.record_incoming(payload.len(), record.reading_count);
            publisher.publish(&record.topic, record.body.as_bytes());
        }
        ParseOutcome::Malformed(reason) => {
            stats.record_bad();
            tracing::debug!(%reason, len = payload.len(), "malformed datagram dropped");
        }
    }
}
