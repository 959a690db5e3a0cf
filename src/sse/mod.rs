//! Server-sent event encoding
//!
//! The core never speaks a wire protocol itself. This module is the thin edge
//! a transport uses to turn events into SSE text frames:
//!
//! ```text
//! event: message
//! id: 42
//! data: {"sequence":42,"operationType":"insert","fullDocument":{...},"timestamp":"..."}
//!
//! ```

pub mod frame;
pub mod sink;

pub use frame::{encode_event, encode_ping, encode_snapshot, FrameKind, SseFrame};
pub use sink::SseSink;
