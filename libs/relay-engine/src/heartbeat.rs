use std::time::Duration;

use tokio::time::{Instant, Interval, MissedTickBehavior};

use relay_api::BrokerPublisher;

use crate::stats::{StatsAggregator, StatsSnapshot};

pub const DEFAULT_STATS_PREFIX: &str = "system/udp-mqtt-relay";
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_millis(1000);

/// Topics the five heartbeat values are published on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryTopics {
    pub up: String,
    pub messages: String,
    pub bytes: String,
    pub bad_messages: String,
    pub readings: String,
}

impl TelemetryTopics {
    pub fn with_prefix(prefix: &str) -> Self {
        let prefix = prefix.trim_end_matches('/');
        Self {
            up: format!("{prefix}/up"),
            messages: format!("{prefix}/messages"),
            bytes: format!("{prefix}/bytes"),
            bad_messages: format!("{prefix}/badMessages"),
            readings: format!("{prefix}/readings"),
        }
    }
}

impl Default for TelemetryTopics {
    fn default() -> Self {
        Self::with_prefix(DEFAULT_STATS_PREFIX)
    }
}

/// Fixed-period telemetry publisher.
///
/// The first tick fires one full period after construction. Late ticks
/// are not bunched up: the schedule shifts instead.
pub struct HeartbeatScheduler {
    interval: Interval,
    topics: TelemetryTopics,
}

impl HeartbeatScheduler {
    /// Must be called within a tokio runtime. `period` must be non-zero.
    pub fn new(period: Duration, topics: TelemetryTopics) -> Self {
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { interval, topics }
    }

    /// Wait for the next tick. Cancel safe.
    pub async fn tick(&mut self) {
        self.interval.tick().await;
    }

    /// Snapshot and reset the counters, then publish them.
    pub fn fire(&self, stats: &mut StatsAggregator, publisher: &dyn BrokerPublisher) -> StatsSnapshot {
        let snapshot = stats.snapshot_and_reset();
        self.emit(&snapshot, publisher);
        snapshot
    }

    pub fn emit(&self, snapshot: &StatsSnapshot, publisher: &dyn BrokerPublisher) {
        let t = &self.topics;
        publisher.publish(&t.up, snapshot.uptime_ms.to_string().as_bytes());
        publisher.publish(&t.messages, snapshot.messages.to_string().as_bytes());
        publisher.publish(&t.bytes, snapshot.bytes.to_string().as_bytes());
        publisher.publish(&t.bad_messages, snapshot.bad_messages.to_string().as_bytes());
        publisher.publish(&t.readings, snapshot.readings.to_string().as_bytes());
        tracing::trace!(?snapshot, "heartbeat published");
    }
}
