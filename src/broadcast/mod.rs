//! Event broadcaster
//!
//! The [`Broadcaster`] ties the event log and the subscriber registry
//! together. Producers call [`Broadcaster::publish`]; transports call
//! [`Broadcaster::join`] / [`Broadcaster::snapshot`] per connection.
//!
//! # Delivery guarantees
//!
//! - Per-subscriber FIFO, matching log order.
//! - At most once per live subscriber: a full queue drops the newest event
//!   for that subscriber, never blocking the producer.
//! - No delivery to subscribers that joined after the event was published;
//!   use [`Broadcaster::join_with_backlog`] to fetch history and go live
//!   without a gap.

pub mod broadcaster;
pub mod config;
pub mod stats;

pub use broadcaster::Broadcaster;
pub use config::{BroadcasterConfig, DEFAULT_QUEUE_CAPACITY, MIN_TRIM_INTERVAL};
pub use stats::BroadcasterStats;
