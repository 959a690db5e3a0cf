//! Subscriber registry for live fan-out
//!
//! The registry manages live subscribers and the bounded queue each one reads
//! from. The broadcaster walks a point-in-time copy of the live set and pushes
//! into every queue without waiting.
//!
//! # Architecture
//!
//! ```text
//!                        Arc<SubscriberRegistry>
//!                   ┌────────────────────────────────┐
//!                   │ subscribers: HashMap<Id,       │
//!                   │   SubscriberEntry {            │
//!                   │     tx: mpsc::Sender (bounded) │
//!                   │   }                            │
//!                   │ >                              │
//!                   └───────────────┬────────────────┘
//!                                   │
//!         ┌─────────────────────────┼─────────────────────────┐
//!         │                         │                         │
//!         ▼                         ▼                         ▼
//!    [Broadcaster]            [Subscription]            [Subscription]
//!    for_each()               next_event()              next_event()
//!         │                         │                         │
//!         └──► try_send() ─────────►└──► EventSink ──► transport
//! ```
//!
//! # Slow consumers
//!
//! Each subscriber has its own queue. When a queue is full the new event is
//! dropped for that subscriber only; the publisher and every other
//! subscriber carry on. Events are shared as `Arc<ChangeEvent>`, so a fan-out
//! to many queues never copies a payload.

pub mod entry;
pub mod store;
pub mod subscription;

pub use entry::{
    DeliveryOutcome, SubscriberEntry, SubscriberId, SubscriptionState, SubscriptionStats,
};
pub use store::SubscriberRegistry;
pub use subscription::{EventSink, Subscription};
