//! Change events and the ordered log that stores them
//!
//! Producers submit [`NewEvent`]s; the log validates them, stamps a sequence
//! number and timestamp, and keeps the resulting [`ChangeEvent`]s in arrival
//! order for snapshot reads.

pub mod log;
pub mod record;

pub use log::{EventLog, RetentionPolicy};
pub use record::{ChangeEvent, Document, NewEvent};
