//! Broadcaster implementation
//!
//! Appends every published event to the log and pushes it to each live
//! subscriber's queue.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{Error, Result};
use crate::event::{ChangeEvent, EventLog, NewEvent};
use crate::registry::{DeliveryOutcome, SubscriberRegistry, Subscription};

use super::config::BroadcasterConfig;
use super::stats::{BroadcastCounters, BroadcasterStats};

/// Entry point for producers and subscribers
///
/// `publish` can be called from any number of threads or tasks. Appending an
/// event and pushing it to every queue happen under one sequencing lock, so
/// each subscriber sees events in exactly log order. Pushes never wait: a full
/// queue drops the event for that subscriber only.
pub struct Broadcaster {
    log: EventLog,

    registry: Arc<SubscriberRegistry>,

    /// Orders append + fan-out across concurrent publishers
    sequencer: Mutex<()>,

    counters: BroadcastCounters,

    closed: AtomicBool,

    config: BroadcasterConfig,
}

impl Broadcaster {
    /// Create a broadcaster with default configuration
    pub fn new() -> Self {
        Self::with_config(BroadcasterConfig::default())
    }

    /// Create a broadcaster with custom configuration
    pub fn with_config(config: BroadcasterConfig) -> Self {
        let config = config.normalized();
        Self {
            log: EventLog::with_retention(config.retention),
            registry: Arc::new(SubscriberRegistry::new()),
            sequencer: Mutex::new(()),
            counters: BroadcastCounters::new(),
            closed: AtomicBool::new(false),
            config,
        }
    }

    /// Get the broadcaster configuration
    pub fn config(&self) -> &BroadcasterConfig {
        &self.config
    }

    /// The underlying event log
    pub fn log(&self) -> &EventLog {
        &self.log
    }

    /// The underlying subscriber registry
    pub fn registry(&self) -> &Arc<SubscriberRegistry> {
        &self.registry
    }

    /// Publish an event to the log and every live subscriber
    ///
    /// Fills in the timestamp if absent. Malformed events are rejected and
    /// never enter the log. Returns the stored event.
    pub fn publish(&self, event: NewEvent) -> Result<Arc<ChangeEvent>> {
        if self.is_closed() {
            return Err(Error::Closed);
        }

        let (operation_type, payload, timestamp) = match event.into_parts() {
            Ok(parts) => parts,
            Err(e) => {
                self.counters.record_rejected();
                tracing::debug!(error = %e, "Event rejected");
                return Err(e);
            }
        };

        let mut delivered = 0u64;
        let mut dropped = 0u64;

        let event = {
            let _order = self.sequencer.lock();
            // `shutdown` sets the flag before taking this lock
            if self.is_closed() {
                return Err(Error::Closed);
            }
            let event = self.log.append_parts(operation_type, payload, timestamp);

            self.registry.for_each(|entry| match entry.try_deliver(&event) {
                DeliveryOutcome::Delivered => delivered += 1,
                DeliveryOutcome::Dropped => {
                    dropped += 1;
                    tracing::debug!(
                        subscriber = %entry.id(),
                        sequence = event.sequence,
                        "Subscriber queue full, event dropped"
                    );
                }
                DeliveryOutcome::Closed => {}
            });

            event
        };

        self.counters.record_publish(delivered, dropped);

        tracing::trace!(
            sequence = event.sequence,
            operation = %event.operation_type,
            delivered = delivered,
            dropped = dropped,
            "Event published"
        );

        Ok(event)
    }

    /// Parse a JSON ingestion body and publish it
    pub fn publish_json(&self, body: &str) -> Result<Arc<ChangeEvent>> {
        match NewEvent::from_json(body) {
            Ok(event) => self.publish(event),
            Err(e) => {
                self.counters.record_rejected();
                tracing::debug!(error = %e, "Event body rejected");
                Err(e)
            }
        }
    }

    /// Start live delivery with a queue of `queue_capacity` events
    ///
    /// After shutdown the returned handle has already ended.
    pub fn join(&self, queue_capacity: usize) -> Subscription {
        let mut subscription = self.registry.add(queue_capacity);
        if self.is_closed() {
            subscription.leave();
        }
        subscription
    }

    /// Start live delivery with the configured default queue capacity
    pub fn join_default(&self) -> Subscription {
        self.join(self.config.default_queue_capacity)
    }

    /// Join and fetch the backlog in one step
    ///
    /// The backlog ends exactly where live delivery begins: no event is both
    /// in the backlog and on the queue, and none falls between them.
    pub fn join_with_backlog(
        &self,
        queue_capacity: usize,
    ) -> (Subscription, Vec<Arc<ChangeEvent>>) {
        let _order = self.sequencer.lock();
        let backlog = self.log.snapshot();
        let subscription = self.join(queue_capacity);

        tracing::debug!(
            subscriber = %subscription.id(),
            backlog = backlog.len(),
            "Subscriber joined with backlog"
        );

        (subscription, backlog)
    }

    /// Rejoin after a disconnect, fetching only events after `last_sequence`
    ///
    /// Events already evicted by retention cannot be recovered.
    pub fn resume(
        &self,
        queue_capacity: usize,
        last_sequence: u64,
    ) -> (Subscription, Vec<Arc<ChangeEvent>>) {
        let _order = self.sequencer.lock();
        let missed = self.log.snapshot_after(last_sequence);
        let subscription = self.join(queue_capacity);

        tracing::debug!(
            subscriber = %subscription.id(),
            after = last_sequence,
            missed = missed.len(),
            "Subscriber resumed"
        );

        (subscription, missed)
    }

    /// Stop live delivery for a subscription
    ///
    /// Returns `false` if it had already left.
    pub fn leave(&self, subscription: &mut Subscription) -> bool {
        subscription.leave()
    }

    /// Full backlog as of now, in publish order
    pub fn snapshot(&self) -> Vec<Arc<ChangeEvent>> {
        self.log.snapshot()
    }

    /// Number of live subscribers
    pub fn subscriber_count(&self) -> usize {
        self.registry.len()
    }

    /// Apply the log retention policy now
    pub fn trim(&self) -> usize {
        self.log.trim()
    }

    /// Current statistics
    pub fn stats(&self) -> BroadcasterStats {
        self.counters
            .snapshot(self.registry.len(), self.log.len(), self.log.last_sequence())
    }

    /// Whether `shutdown` has been called
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Stop accepting events and end every subscription
    ///
    /// Subscribers can still drain what was queued before the shutdown.
    pub fn shutdown(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }

        let _order = self.sequencer.lock();
        let closed = self.registry.close_all();
        tracing::info!(
            subscribers = closed,
            events = self.log.len(),
            "Broadcaster shut down"
        );
    }

    /// Spawn background trim task
    ///
    /// Returns a handle that can be used to abort the task. The task is a
    /// no-op loop when no retention limit is configured.
    pub fn spawn_trim_task(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let broadcaster = Arc::clone(self);
        let interval = broadcaster.config.trim_interval;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                if broadcaster.is_closed() {
                    break;
                }
                broadcaster.trim();
            }
        })
    }
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new()
    }
}
