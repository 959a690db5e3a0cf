//! Subscriber registry implementation
//!
//! The registry tracks every live subscriber and hands the broadcaster a
//! point-in-time view of the live set for each fan-out.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;

use super::entry::{SubscriberCounters, SubscriberEntry, SubscriberId};
use super::subscription::Subscription;

/// Registry of live subscribers
///
/// Mutations and snapshots take one short-held mutex. The lock is never held
/// while events are pushed to queues, so a slow subscriber cannot stall
/// joins, leaves or other publishers.
pub struct SubscriberRegistry {
    /// Map of subscriber id to its queue entry
    subscribers: Mutex<HashMap<SubscriberId, Arc<SubscriberEntry>>>,

    next_id: AtomicU64,
}

impl SubscriberRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            subscribers: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register a new subscriber with a bounded queue
    ///
    /// Capacity is clamped to at least 1. The returned handle is already live.
    pub fn add(self: &Arc<Self>, queue_capacity: usize) -> Subscription {
        let capacity = queue_capacity.max(1);
        let id = SubscriberId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = mpsc::channel(capacity);
        let counters = Arc::new(SubscriberCounters::default());

        let entry = Arc::new(SubscriberEntry::new(
            id,
            tx,
            capacity,
            Arc::clone(&counters),
        ));

        let mut subscription = Subscription::new(id, rx, counters, Arc::downgrade(self));

        let live = {
            let mut subscribers = self.subscribers.lock();
            subscribers.insert(id, entry);
            subscribers.len()
        };
        subscription.mark_live();

        tracing::info!(
            subscriber = %id,
            capacity = capacity,
            subscribers = live,
            "Subscriber added"
        );

        subscription
    }

    /// Unregister a subscriber and close the producer side of its queue
    ///
    /// Returns `false` if the id was not registered; removing twice is a no-op.
    pub fn remove(&self, id: SubscriberId) -> bool {
        let (entry, live) = {
            let mut subscribers = self.subscribers.lock();
            let entry = subscribers.remove(&id);
            (entry, subscribers.len())
        };

        match entry {
            Some(entry) => {
                entry.close();
                let stats = entry.stats();
                tracing::info!(
                    subscriber = %id,
                    delivered = stats.delivered,
                    dropped = stats.dropped,
                    subscribers = live,
                    "Subscriber removed"
                );
                true
            }
            None => {
                tracing::debug!(subscriber = %id, "Remove of unknown subscriber ignored");
                false
            }
        }
    }

    /// Visit every subscriber that was live when the call started
    ///
    /// The live set is copied under the lock and visited after releasing it,
    /// so `visit` may run concurrently with `add`/`remove`.
    pub fn for_each<F>(&self, mut visit: F)
    where
        F: FnMut(&SubscriberEntry),
    {
        for entry in self.live_entries() {
            visit(&entry);
        }
    }

    fn live_entries(&self) -> Vec<Arc<SubscriberEntry>> {
        self.subscribers.lock().values().cloned().collect()
    }

    /// Remove every subscriber; each reader sees end-of-stream once drained
    pub fn close_all(&self) -> usize {
        let drained: Vec<Arc<SubscriberEntry>> = {
            let mut subscribers = self.subscribers.lock();
            subscribers.drain().map(|(_, entry)| entry).collect()
        };

        for entry in &drained {
            entry.close();
        }

        if !drained.is_empty() {
            tracing::info!(closed = drained.len(), "All subscribers closed");
        }
        drained.len()
    }

    /// Whether a subscriber is currently registered
    pub fn contains(&self, id: SubscriberId) -> bool {
        self.subscribers.lock().contains_key(&id)
    }

    /// Number of live subscribers
    pub fn len(&self) -> usize {
        self.subscribers.lock().len()
    }

    /// Whether there are no live subscribers
    pub fn is_empty(&self) -> bool {
        self.subscribers.lock().is_empty()
    }
}

impl Default for SubscriberRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::Map;

    use super::*;
    use crate::event::ChangeEvent;
    use crate::registry::{DeliveryOutcome, SubscriptionState};

    fn sample(sequence: u64) -> Arc<ChangeEvent> {
        Arc::new(ChangeEvent {
            sequence,
            operation_type: "insert".into(),
            payload: Map::new(),
            timestamp: chrono::Utc::now(),
        })
    }

    #[tokio::test]
    async fn test_add_remove() {
        let registry = Arc::new(SubscriberRegistry::new());

        let sub = registry.add(8);
        assert_eq!(sub.state(), SubscriptionState::Live);
        assert!(registry.contains(sub.id()));
        assert_eq!(registry.len(), 1);

        assert!(registry.remove(sub.id()));
        assert!(!registry.contains(sub.id()));
        assert!(registry.is_empty());

        // Second removal is a no-op
        assert!(!registry.remove(sub.id()));
    }

    #[tokio::test]
    async fn test_unique_ids() {
        let registry = Arc::new(SubscriberRegistry::new());
        let a = registry.add(1);
        let b = registry.add(1);

        assert_ne!(a.id(), b.id());
        assert_eq!(registry.len(), 2);
    }

    #[tokio::test]
    async fn test_zero_capacity_clamped() {
        let registry = Arc::new(SubscriberRegistry::new());
        let mut sub = registry.add(0);

        let mut outcomes = Vec::new();
        registry.for_each(|entry| {
            assert_eq!(entry.capacity(), 1);
            outcomes.push(entry.try_deliver(&sample(1)));
        });
        assert_eq!(outcomes, vec![DeliveryOutcome::Delivered]);
        assert_eq!(sub.try_next_event().unwrap().sequence, 1);
    }

    #[tokio::test]
    async fn test_for_each_tolerates_mutation() {
        let registry = Arc::new(SubscriberRegistry::new());
        let first = registry.add(4);
        let _second = registry.add(4);

        let mut visited = 0;
        let mut late = Vec::new();
        registry.for_each(|_| {
            visited += 1;
            // Mutating during iteration must not deadlock
            late.push(registry.add(4));
            registry.remove(first.id());
        });

        assert_eq!(visited, 2);
        assert_eq!(registry.len(), 3);
    }

    #[tokio::test]
    async fn test_remove_closes_queue() {
        let registry = Arc::new(SubscriberRegistry::new());
        let mut sub = registry.add(4);

        registry.for_each(|entry| {
            entry.try_deliver(&sample(1));
        });
        registry.remove(sub.id());

        // Queued event is still readable, then the stream ends
        assert_eq!(sub.next_event().await.unwrap().sequence, 1);
        assert!(sub.next_event().await.is_none());
        assert_eq!(sub.state(), SubscriptionState::Closed);
    }

    #[tokio::test]
    async fn test_close_all() {
        let registry = Arc::new(SubscriberRegistry::new());
        let mut a = registry.add(4);
        let mut b = registry.add(4);

        assert_eq!(registry.close_all(), 2);
        assert!(registry.is_empty());
        assert!(a.next_event().await.is_none());
        assert!(b.next_event().await.is_none());
    }
}
