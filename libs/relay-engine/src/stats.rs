use std::time::{Duration, Instant};

/// Whole milliseconds, clamped to `u64::MAX`.
pub(crate) fn saturating_millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

/// Counters accumulated between two heartbeats.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct Counters {
    incoming_messages: u64,
    incoming_bytes: u64,
    incoming_readings: u64,
    bad_messages: u64,
}

/// Values captured by one heartbeat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub uptime_ms: u64,
    pub messages: u64,
    pub bytes: u64,
    pub bad_messages: u64,
    pub readings: u64,
}

/// Traffic counters of the relay.
///
/// Owned by the relay loop and mutated through `&mut self` only, so
/// recording and `snapshot_and_reset` can never interleave.
#[derive(Debug)]
pub struct StatsAggregator {
    start_time: Instant,
    counters: Counters,
}

impl Default for StatsAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl StatsAggregator {
    pub fn new() -> Self {
        Self::started_at(Instant::now())
    }

    pub fn started_at(start_time: Instant) -> Self {
        Self {
            start_time,
            counters: Counters::default(),
        }
    }

    pub fn record_incoming(&mut self, byte_len: usize, reading_count: usize) {
        self.counters.incoming_messages += 1;
        self.counters.incoming_bytes += byte_len as u64;
        self.counters.incoming_readings += reading_count as u64;
    }

    pub fn record_bad(&mut self) {
        self.counters.bad_messages += 1;
    }

    pub fn snapshot_and_reset(&mut self) -> StatsSnapshot {
        self.snapshot_and_reset_at(Instant::now())
    }

    /// Capture the counters, zero them, keep `start_time`.
    pub fn snapshot_and_reset_at(&mut self, now: Instant) -> StatsSnapshot {
        let c = std::mem::take(&mut self.counters);
        let uptime = now.saturating_duration_since(self.start_time);
        StatsSnapshot {
            uptime_ms: saturating_millis(uptime),
            messages: c.incoming_messages,
            bytes: c.incoming_bytes,
            bad_messages: c.bad_messages,
            readings: c.incoming_readings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn millis_saturate_instead_of_truncating() {
        assert_eq!(saturating_millis(Duration::from_millis(1500)), 1500);
        assert_eq!(saturating_millis(Duration::MAX), u64::MAX);
    }

    #[test]
    fn accumulates_between_snapshots() {
        let start = Instant::now();
        let mut stats = StatsAggregator::started_at(start);
        stats.record_incoming(16, 1);
        stats.record_incoming(10, 3);
        stats.record_bad();
        stats.record_bad();

        let snap = stats.snapshot_and_reset_at(start + Duration::from_millis(1500));
        assert_eq!(
            snap,
            StatsSnapshot {
                uptime_ms: 1500,
                messages: 2,
                bytes: 26,
                bad_messages: 2,
                readings: 4,
            }
        );
    }

    #[test]
    fn reset_keeps_start_time() {
        let start = Instant::now();
        let mut stats = StatsAggregator::started_at(start);
        stats.record_incoming(5, 2);
        stats.snapshot_and_reset_at(start + Duration::from_secs(1));

        let snap = stats.snapshot_and_reset_at(start + Duration::from_secs(2));
        assert_eq!(snap.uptime_ms, 2000);
        assert_eq!((snap.messages, snap.bytes, snap.bad_messages, snap.readings), (0, 0, 0, 0));
    }

    #[test]
    fn idle_ticks_report_zero() {
        let mut stats = StatsAggregator::new();
        let a = stats.snapshot_and_reset();
        let b = stats.snapshot_and_reset();
        for snap in [a, b] {
            assert_eq!((snap.messages, snap.bytes, snap.bad_messages, snap.readings), (0, 0, 0, 0));
        }
        assert!(b.uptime_ms >= a.uptime_ms);
    }
}
