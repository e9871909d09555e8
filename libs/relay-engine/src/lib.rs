//! Ingestion → translation → publication pipeline of the relay, plus
//! the traffic counters and the heartbeat that reports them.

pub mod heartbeat;
pub mod listener;
pub mod ready;
pub mod relay;
pub mod stats;

#[cfg(test)]
mod test_support;

pub use heartbeat::{HeartbeatScheduler, TelemetryTopics};
pub use listener::{DatagramListener, DatagramSource};
pub use ready::await_ready;
pub use relay::{Relay, RelaySettings, RelayState, RunningRelay, relay_datagram, relay_loop};
pub use stats::{StatsAggregator, StatsSnapshot};
