//! Subscriber entry and state types
//!
//! This module defines the per-subscriber state stored in the registry.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::event::ChangeEvent;

/// Opaque identity of one subscriber connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(pub(crate) u64);

impl SubscriberId {
    /// Raw numeric value, for logging
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Lifecycle state of a subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionState {
    /// Registered with an empty queue; becomes `Live` as soon as `add` returns
    Joining,
    /// Registered; queue accepts deliveries
    Live,
    /// Deregistered; already-queued events can still be read
    Draining,
    /// Queue exhausted or handle released
    Closed,
}

/// Result of a single non-blocking delivery attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// Event was queued
    Delivered,
    /// Queue was full; event dropped for this subscriber only
    Dropped,
    /// Subscriber is gone
    Closed,
}

/// Counters shared between the registry entry and the consumer handle
#[derive(Debug, Default)]
pub(crate) struct SubscriberCounters {
    pub(crate) delivered: AtomicU64,
    pub(crate) dropped: AtomicU64,
}

/// Registry entry for a single subscriber (the producer side of its queue)
#[derive(Debug)]
pub struct SubscriberEntry {
    id: SubscriberId,

    /// Bounded delivery queue
    tx: mpsc::Sender<Arc<ChangeEvent>>,

    /// Queue capacity requested at join time (after clamping)
    capacity: usize,

    /// Set once the entry is removed; no deliveries after that
    closed: AtomicBool,

    pub(crate) counters: Arc<SubscriberCounters>,
}

impl SubscriberEntry {
    pub(super) fn new(
        id: SubscriberId,
        tx: mpsc::Sender<Arc<ChangeEvent>>,
        capacity: usize,
        counters: Arc<SubscriberCounters>,
    ) -> Self {
        Self {
            id,
            tx,
            capacity,
            closed: AtomicBool::new(false),
            counters,
        }
    }

    /// Subscriber identity
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Queue capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Whether the entry has been removed from the registry
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire) || self.tx.is_closed()
    }

    /// Snapshot of this subscriber's counters
    pub fn stats(&self) -> SubscriptionStats {
        SubscriptionStats::from_counters(&self.counters)
    }

    pub(super) fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    /// Push an event without waiting
    ///
    /// A full queue drops the new event; what is already queued is kept.
    pub(crate) fn try_deliver(&self, event: &Arc<ChangeEvent>) -> DeliveryOutcome {
        if self.closed.load(Ordering::Acquire) {
            return DeliveryOutcome::Closed;
        }

        match self.tx.try_send(Arc::clone(event)) {
            Ok(()) => {
                self.counters.delivered.fetch_add(1, Ordering::Relaxed);
                DeliveryOutcome::Delivered
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                DeliveryOutcome::Dropped
            }
            Err(mpsc::error::TrySendError::Closed(_)) => DeliveryOutcome::Closed,
        }
    }
}

/// Delivery statistics for one subscriber
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubscriptionStats {
    /// Events placed on the queue
    pub delivered: u64,
    /// Events dropped because the queue was full
    pub dropped: u64,
}

impl SubscriptionStats {
    pub(crate) fn from_counters(counters: &SubscriberCounters) -> Self {
        Self {
            delivered: counters.delivered.load(Ordering::Relaxed),
            dropped: counters.dropped.load(Ordering::Relaxed),
        }
    }

    /// Fraction of offered events that were dropped
    pub fn drop_ratio(&self) -> f64 {
        let offered = self.delivered + self.dropped;
        if offered > 0 {
            self.dropped as f64 / offered as f64
        } else {
            0.0
        }
    }
}
