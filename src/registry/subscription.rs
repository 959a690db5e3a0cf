//! Consumer-side subscription handle
//!
//! A [`Subscription`] owns the receiving end of one subscriber's bounded
//! queue. It walks through `Joining → Live → Draining → Closed`:
//!
//! - `leave()` (or cancellation) deregisters the subscriber and stops new
//!   deliveries, but events that were already queued can still be read.
//! - Once the queue is exhausted, reads return `None` and the handle is closed.
//! - Dropping the handle deregisters it, so a vanished consumer never leaks a
//!   registry entry.

use std::future::Future;
use std::sync::{Arc, Weak};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::event::ChangeEvent;

use super::entry::{SubscriberCounters, SubscriberId, SubscriptionState, SubscriptionStats};
use super::store::SubscriberRegistry;

/// Destination for events drained by [`Subscription::forward`]
///
/// Implementations usually write to a network transport. Returning an error
/// ends the forwarding loop for this subscriber only.
pub trait EventSink: Send {
    /// Deliver one event
    fn deliver(&mut self, event: &ChangeEvent) -> impl Future<Output = Result<()>> + Send;
}

/// Handle to one live subscription
pub struct Subscription {
    id: SubscriberId,
    rx: mpsc::Receiver<Arc<ChangeEvent>>,
    state: SubscriptionState,
    counters: Arc<SubscriberCounters>,
    registry: Weak<SubscriberRegistry>,
}

impl Subscription {
    pub(super) fn new(
        id: SubscriberId,
        rx: mpsc::Receiver<Arc<ChangeEvent>>,
        counters: Arc<SubscriberCounters>,
        registry: Weak<SubscriberRegistry>,
    ) -> Self {
        Self {
            id,
            rx,
            state: SubscriptionState::Joining,
            counters,
            registry,
        }
    }

    pub(super) fn mark_live(&mut self) {
        if self.state == SubscriptionState::Joining {
            self.state = SubscriptionState::Live;
        }
    }

    /// Subscriber identity
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Current lifecycle state
    pub fn state(&self) -> SubscriptionState {
        self.state
    }

    /// Delivery counters for this subscriber
    pub fn stats(&self) -> SubscriptionStats {
        SubscriptionStats::from_counters(&self.counters)
    }

    /// Stop live delivery
    ///
    /// Deregisters the subscriber and closes the queue to new events. Events
    /// already queued remain readable. Returns `false` if the subscription had
    /// already left; calling it again is harmless.
    pub fn leave(&mut self) -> bool {
        match self.state {
            SubscriptionState::Joining | SubscriptionState::Live => {
                if let Some(registry) = self.registry.upgrade() {
                    registry.remove(self.id);
                }
                self.rx.close();
                self.state = SubscriptionState::Draining;
                true
            }
            SubscriptionState::Draining | SubscriptionState::Closed => false,
        }
    }

    /// Wait for the next event
    ///
    /// Returns `None` once the stream has ended: the subscription left and its
    /// queue is drained, or the registry dropped it. Cancel-safe: dropping the
    /// future loses no event.
    pub async fn next_event(&mut self) -> Option<Arc<ChangeEvent>> {
        if self.state == SubscriptionState::Closed {
            return None;
        }
        let received = self.rx.recv().await;
        self.observe(received)
    }

    /// Wait for the next event or for `cancel` to fire
    ///
    /// On cancellation the subscription leaves (moving to `Draining`) and
    /// `None` is returned; anything still queued can be read with
    /// [`next_event`](Self::next_event).
    pub async fn next_event_or_cancel(
        &mut self,
        cancel: &CancellationToken,
    ) -> Option<Arc<ChangeEvent>> {
        if self.state == SubscriptionState::Closed {
            return None;
        }

        let received = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            received = self.rx.recv() => Some(received),
        };

        match received {
            Some(received) => self.observe(received),
            None => {
                if self.leave() {
                    tracing::debug!(subscriber = %self.id, "Subscription cancelled");
                }
                None
            }
        }
    }

    /// Take the next queued event without waiting
    pub fn try_next_event(&mut self) -> Option<Arc<ChangeEvent>> {
        if self.state == SubscriptionState::Closed {
            return None;
        }

        match self.rx.try_recv() {
            Ok(event) => Some(event),
            Err(mpsc::error::TryRecvError::Empty) => None,
            Err(mpsc::error::TryRecvError::Disconnected) => {
                self.state = SubscriptionState::Closed;
                None
            }
        }
    }

    /// Drain events into `sink` until the stream ends or `cancel` fires
    ///
    /// Returns the number of events forwarded. A sink error makes the
    /// subscription leave and is returned to the caller.
    pub async fn forward<S>(&mut self, sink: &mut S, cancel: &CancellationToken) -> Result<u64>
    where
        S: EventSink,
    {
        let mut forwarded = 0u64;

        while let Some(event) = self.next_event_or_cancel(cancel).await {
            if let Err(e) = sink.deliver(&event).await {
                tracing::warn!(
                    subscriber = %self.id,
                    sequence = event.sequence,
                    error = %e,
                    "Sink rejected event, leaving"
                );
                self.leave();
                return Err(e);
            }
            forwarded += 1;
        }

        tracing::debug!(
            subscriber = %self.id,
            forwarded = forwarded,
            "Forwarding finished"
        );
        Ok(forwarded)
    }

    fn observe(&mut self, received: Option<Arc<ChangeEvent>>) -> Option<Arc<ChangeEvent>> {
        if received.is_none() {
            if self.state == SubscriptionState::Live {
                // Removed by the registry rather than by us
                if let Some(registry) = self.registry.upgrade() {
                    registry.remove(self.id);
                }
            }
            self.state = SubscriptionState::Closed;
        }
        received
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if matches!(
            self.state,
            SubscriptionState::Joining | SubscriptionState::Live
        ) {
            if let Some(registry) = self.registry.upgrade() {
                registry.remove(self.id);
            }
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("state", &self.state)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::Map;
    use tokio_test::{assert_pending, assert_ready, task};

    use super::*;
    use crate::error::Error;

    fn sample(sequence: u64) -> Arc<ChangeEvent> {
        Arc::new(ChangeEvent {
            sequence,
            operation_type: "insert".into(),
            payload: Map::new(),
            timestamp: chrono::Utc::now(),
        })
    }

    fn push(registry: &SubscriberRegistry, sequence: u64) {
        let event = sample(sequence);
        registry.for_each(|entry| {
            entry.try_deliver(&event);
        });
    }

    #[derive(Default)]
    struct VecSink {
        seen: Vec<u64>,
        fail_on: Option<u64>,
    }

    impl EventSink for VecSink {
        async fn deliver(&mut self, event: &ChangeEvent) -> Result<()> {
            if self.fail_on == Some(event.sequence) {
                return Err(Error::Sink("client went away".into()));
            }
            self.seen.push(event.sequence);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_leave_is_idempotent() {
        let registry = Arc::new(SubscriberRegistry::new());
        let mut sub = registry.add(4);

        assert!(sub.leave());
        assert_eq!(sub.state(), SubscriptionState::Draining);
        assert!(!sub.leave());
        assert!(registry.is_empty());

        assert!(sub.next_event().await.is_none());
        assert_eq!(sub.state(), SubscriptionState::Closed);
        assert!(sub.next_event().await.is_none());
        assert!(!sub.leave());
    }

    #[tokio::test]
    async fn test_drain_after_leave() {
        let registry = Arc::new(SubscriberRegistry::new());
        let mut sub = registry.add(4);

        push(&registry, 1);
        push(&registry, 2);
        sub.leave();
        // Not registered any more, so this one never arrives
        push(&registry, 3);

        assert_eq!(sub.next_event().await.unwrap().sequence, 1);
        assert_eq!(sub.next_event().await.unwrap().sequence, 2);
        assert!(sub.next_event().await.is_none());
    }

    #[tokio::test]
    async fn test_next_event_waits() {
        let registry = Arc::new(SubscriberRegistry::new());
        let mut sub = registry.add(4);

        {
            let mut next = task::spawn(sub.next_event());
            assert_pending!(next.poll());
            push(&registry, 1);
            assert!(next.is_woken());
            let event = assert_ready!(next.poll());
            assert_eq!(event.unwrap().sequence, 1);
        }
    }

    #[tokio::test]
    async fn test_cancel_interrupts_wait() {
        let registry = Arc::new(SubscriberRegistry::new());
        let mut sub = registry.add(4);
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let result = tokio::time::timeout(Duration::from_secs(1), sub.next_event_or_cancel(&cancel))
            .await
            .expect("cancellation should interrupt the read");
        assert!(result.is_none());
        assert_eq!(sub.state(), SubscriptionState::Draining);
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_cancel_then_drain_queued() {
        let registry = Arc::new(SubscriberRegistry::new());
        let mut sub = registry.add(4);
        push(&registry, 1);
        push(&registry, 2);

        let cancel = CancellationToken::new();
        cancel.cancel();

        // Cancellation wins over queued events
        assert!(sub.next_event_or_cancel(&cancel).await.is_none());
        assert_eq!(sub.state(), SubscriptionState::Draining);
        assert!(registry.is_empty());

        // Nothing new arrives, but what was queued is still readable
        push(&registry, 3);
        assert_eq!(sub.next_event().await.unwrap().sequence, 1);
        assert_eq!(sub.next_event().await.unwrap().sequence, 2);
        assert!(sub.next_event().await.is_none());
        assert_eq!(sub.state(), SubscriptionState::Closed);
        assert!(sub.next_event_or_cancel(&cancel).await.is_none());
    }

    #[tokio::test]
    async fn test_try_next_event() {
        let registry = Arc::new(SubscriberRegistry::new());
        let mut sub = registry.add(4);

        assert!(sub.try_next_event().is_none());
        assert_eq!(sub.state(), SubscriptionState::Live);

        push(&registry, 1);
        assert_eq!(sub.try_next_event().unwrap().sequence, 1);

        registry.remove(sub.id());
        assert!(sub.try_next_event().is_none());
        assert_eq!(sub.state(), SubscriptionState::Closed);
    }

    #[tokio::test]
    async fn test_drop_deregisters() {
        let registry = Arc::new(SubscriberRegistry::new());
        let sub = registry.add(4);
        let id = sub.id();

        drop(sub);
        assert!(!registry.contains(id));
    }

    #[tokio::test]
    async fn test_forward_until_stream_end() {
        let registry = Arc::new(SubscriberRegistry::new());
        let mut sub = registry.add(8);
        for n in 1..=3 {
            push(&registry, n);
        }
        registry.close_all();

        let mut sink = VecSink::default();
        let forwarded = sub
            .forward(&mut sink, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(forwarded, 3);
        assert_eq!(sink.seen, vec![1, 2, 3]);
        assert_eq!(sub.state(), SubscriptionState::Closed);
    }

    #[tokio::test]
    async fn test_forward_sink_error_leaves() {
        let registry = Arc::new(SubscriberRegistry::new());
        let mut sub = registry.add(8);
        for n in 1..=3 {
            push(&registry, n);
        }

        let mut sink = VecSink {
            fail_on: Some(2),
            ..Default::default()
        };
        let result = sub.forward(&mut sink, &CancellationToken::new()).await;

        assert!(matches!(result, Err(Error::Sink(_))));
        assert_eq!(sink.seen, vec![1]);
        assert_eq!(sub.state(), SubscriptionState::Draining);
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_stats_track_drops() {
        let registry = Arc::new(SubscriberRegistry::new());
        let sub = registry.add(1);

        push(&registry, 1);
        push(&registry, 2);

        let stats = sub.stats();
        assert_eq!(stats.delivered, 1);
        assert_eq!(stats.dropped, 1);
    }
}
