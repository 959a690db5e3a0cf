//! Statistics for the broadcaster

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Running counters, updated with relaxed atomics on every publish
#[derive(Debug)]
pub(crate) struct BroadcastCounters {
    started_at: Instant,
    published: AtomicU64,
    rejected: AtomicU64,
    delivered: AtomicU64,
    dropped: AtomicU64,
}

impl BroadcastCounters {
    pub(crate) fn new() -> Self {
        Self {
            started_at: Instant::now(),
            published: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
            delivered: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        }
    }

    pub(crate) fn record_publish(&self, delivered: u64, dropped: u64) {
        self.published.fetch_add(1, Ordering::Relaxed);
        self.delivered.fetch_add(delivered, Ordering::Relaxed);
        self.dropped.fetch_add(dropped, Ordering::Relaxed);
    }

    pub(crate) fn record_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(
        &self,
        subscribers: usize,
        log_len: usize,
        last_sequence: u64,
    ) -> BroadcasterStats {
        BroadcasterStats {
            published: self.published.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            subscribers,
            log_len,
            last_sequence,
            uptime: self.started_at.elapsed(),
        }
    }
}

/// Broadcaster-wide statistics
#[derive(Debug, Clone, Default)]
pub struct BroadcasterStats {
    /// Events accepted into the log
    pub published: u64,
    /// Events rejected at the publish boundary
    pub rejected: u64,
    /// Queue pushes that succeeded, summed over subscribers
    pub delivered: u64,
    /// Queue pushes dropped because a subscriber was full
    pub dropped: u64,
    /// Live subscribers
    pub subscribers: usize,
    /// Events currently held in the log
    pub log_len: usize,
    /// Sequence number of the newest event
    pub last_sequence: u64,
    /// Time since the broadcaster was created
    pub uptime: Duration,
}

impl BroadcasterStats {
    /// Accepted events per second since start
    pub fn publish_rate(&self) -> f64 {
        let secs = self.uptime.as_secs_f64();
        if secs > 0.0 {
            self.published as f64 / secs
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let counters = BroadcastCounters::new();
        counters.record_publish(3, 1);
        counters.record_publish(2, 0);
        counters.record_rejected();

        let stats = counters.snapshot(4, 2, 2);
        assert_eq!(stats.published, 2);
        assert_eq!(stats.rejected, 1);
        assert_eq!(stats.delivered, 5);
        assert_eq!(stats.dropped, 1);
        assert_eq!(stats.subscribers, 4);
        assert_eq!(stats.log_len, 2);
        assert_eq!(stats.last_sequence, 2);
    }

    #[test]
    fn test_publish_rate() {
        let stats = BroadcasterStats {
            published: 100,
            uptime: Duration::from_secs(10),
            ..Default::default()
        };
        assert_eq!(stats.publish_rate(), 10.0);

        let idle = BroadcasterStats::default();
        assert_eq!(idle.publish_rate(), 0.0);
    }
}
