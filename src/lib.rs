//! changefeed: in-process change-event broadcasting
//!
//! Producers publish change events; every event is appended to an ordered,
//! queryable log and fanned out to each live subscriber through its own
//! bounded queue. A slow subscriber loses its own events and never slows the
//! producer or any other subscriber.
//!
//! # Architecture
//!
//! ```text
//!                    ┌────────────────────────────┐
//!   publish() ──────►│        Broadcaster         │
//!                    │  ┌──────────┐ ┌──────────┐ │
//!                    │  │ EventLog │ │ Registry │ │
//!                    │  └──────────┘ └────┬─────┘ │
//!                    └────────────────────┼───────┘
//!                            try_send     │
//!              ┌──────────────────────────┼──────────────────┐
//!              ▼                          ▼                  ▼
//!       [queue: sub-1]             [queue: sub-2]     [queue: sub-3]
//!              │                          │                  │
//!        Subscription               Subscription       Subscription
//!              │                          │                  │
//!           SseSink                   your sink           ...
//! ```
//!
//! # Example
//!
//! ```no_run
//! use changefeed::{Broadcaster, NewEvent};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> changefeed::Result<()> {
//!     let broadcaster = Broadcaster::new();
//!     let mut sub = broadcaster.join(100);
//!
//!     broadcaster.publish(NewEvent::new("insert", json!({"name": "Alice"})))?;
//!
//!     if let Some(event) = sub.next_event().await {
//!         println!("{} #{}", event.operation_type, event.sequence);
//!     }
//!     Ok(())
//! }
//! ```

pub mod broadcast;
pub mod error;
pub mod event;
pub mod registry;
pub mod simulator;
pub mod sse;

pub use broadcast::{Broadcaster, BroadcasterConfig, BroadcasterStats};
pub use error::{Error, Result};
pub use event::{ChangeEvent, Document, EventLog, NewEvent, RetentionPolicy};
pub use registry::{
    EventSink, SubscriberId, SubscriberRegistry, Subscription, SubscriptionState,
    SubscriptionStats,
};
pub use simulator::SimulatorConfig;
pub use sse::SseSink;
