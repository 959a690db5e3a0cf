//! Append-only event log
//!
//! Stores every published event in arrival order. Readers get independent
//! snapshots: cloning the `Arc`s under a short read lock, so a snapshot is
//! always a consistent prefix of the log and never advances any shared cursor.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Deserialize;

use crate::error::Result;

use super::record::{ChangeEvent, Document, NewEvent};

/// Retention limits for the log
///
/// Both limits are off by default, in which case the log grows for the
/// lifetime of the process.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RetentionPolicy {
    /// Keep at most this many events (enforced on every append)
    pub max_events: Option<usize>,
    /// Evict events whose timestamp is older than this (enforced by `trim`)
    pub max_age: Option<Duration>,
}

impl RetentionPolicy {
    /// No limits
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Whether any limit is configured
    pub fn is_bounded(&self) -> bool {
        self.max_events.is_some() || self.max_age.is_some()
    }
}

struct LogInner {
    events: VecDeque<Arc<ChangeEvent>>,
    next_sequence: u64,
}

/// Ordered, append-only store of change events
pub struct EventLog {
    inner: RwLock<LogInner>,
    retention: RetentionPolicy,
}

impl EventLog {
    /// Create an empty, unbounded log
    pub fn new() -> Self {
        Self::with_retention(RetentionPolicy::unbounded())
    }

    /// Create an empty log with a retention policy
    pub fn with_retention(retention: RetentionPolicy) -> Self {
        Self {
            inner: RwLock::new(LogInner {
                events: VecDeque::new(),
                next_sequence: 1,
            }),
            retention,
        }
    }

    /// Retention policy in effect
    pub fn retention(&self) -> &RetentionPolicy {
        &self.retention
    }

    /// Append an already validated event
    ///
    /// Assigns the next sequence number and fills in the timestamp.
    pub(crate) fn append_parts(
        &self,
        operation_type: String,
        payload: Document,
        timestamp: Option<DateTime<Utc>>,
    ) -> Arc<ChangeEvent> {
        let mut inner = self.inner.write();

        let event = Arc::new(ChangeEvent {
            sequence: inner.next_sequence,
            operation_type,
            payload,
            timestamp: timestamp.unwrap_or_else(Utc::now),
        });
        inner.next_sequence += 1;
        inner.events.push_back(Arc::clone(&event));

        if let Some(max) = self.retention.max_events {
            while inner.events.len() > max {
                inner.events.pop_front();
            }
        }

        event
    }

    /// Validate and append an event
    pub fn append(&self, event: NewEvent) -> Result<Arc<ChangeEvent>> {
        let (operation_type, payload, timestamp) = event.into_parts()?;
        Ok(self.append_parts(operation_type, payload, timestamp))
    }

    /// All stored events in append order
    pub fn snapshot(&self) -> Vec<Arc<ChangeEvent>> {
        self.inner.read().events.iter().cloned().collect()
    }

    /// Stored events with a sequence number greater than `sequence`
    pub fn snapshot_after(&self, sequence: u64) -> Vec<Arc<ChangeEvent>> {
        let inner = self.inner.read();
        let start = inner.events.partition_point(|e| e.sequence <= sequence);
        inner.events.range(start..).cloned().collect()
    }

    /// Number of stored events
    pub fn len(&self) -> usize {
        self.inner.read().events.len()
    }

    /// Whether the log holds no events
    pub fn is_empty(&self) -> bool {
        self.inner.read().events.is_empty()
    }

    /// Sequence number of the most recently appended event (0 if none yet)
    pub fn last_sequence(&self) -> u64 {
        self.inner.read().next_sequence - 1
    }

    /// Apply the retention policy, returning the number of evicted events
    ///
    /// Age-based eviction walks from the oldest event and stops at the first
    /// one that is young enough, so the log always stays a contiguous suffix.
    pub fn trim(&self) -> usize {
        if !self.retention.is_bounded() {
            return 0;
        }

        let cutoff = self
            .retention
            .max_age
            .and_then(|age| chrono::Duration::from_std(age).ok())
            .and_then(|age| Utc::now().checked_sub_signed(age));

        let mut inner = self.inner.write();
        let before = inner.events.len();

        if let Some(max) = self.retention.max_events {
            while inner.events.len() > max {
                inner.events.pop_front();
            }
        }

        if let Some(cutoff) = cutoff {
            while inner
                .events
                .front()
                .map_or(false, |event| event.timestamp < cutoff)
            {
                inner.events.pop_front();
            }
        }

        let evicted = before - inner.events.len();
        if evicted > 0 {
            tracing::debug!(
                evicted = evicted,
                remaining = inner.events.len(),
                "Event log trimmed"
            );
        }
        evicted
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}
