//! Server-sent event frame types
//!
//! This module defines the frames a transport writes for each subscriber:
//! one `message` frame per change event, periodic `ping` frames, and a
//! `snapshot` frame carrying the backlog as a JSON array.

use std::sync::Arc;

use bytes::{BufMut, Bytes, BytesMut};
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::event::ChangeEvent;

/// Type of SSE frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    /// A single change event
    Message,
    /// Keep-alive carrying the server time
    Ping,
    /// Backlog of events as a JSON array
    Snapshot,
}

impl FrameKind {
    /// Value of the `event:` field
    pub fn name(&self) -> &'static str {
        match self {
            FrameKind::Message => "message",
            FrameKind::Ping => "ping",
            FrameKind::Snapshot => "snapshot",
        }
    }
}

/// One SSE frame, ready to encode
///
/// Cheap to clone: the data is reference-counted `Bytes`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseFrame {
    /// Frame type
    pub kind: FrameKind,
    /// Optional `id:` field; set to the event sequence for messages
    pub id: Option<u64>,
    /// Frame payload
    pub data: Bytes,
}

impl SseFrame {
    /// Frame for one change event
    pub fn message(event: &ChangeEvent) -> Result<Self> {
        Ok(Self {
            kind: FrameKind::Message,
            id: Some(event.sequence),
            data: Bytes::from(serde_json::to_vec(event)?),
        })
    }

    /// Keep-alive frame
    pub fn ping(now: DateTime<Utc>) -> Self {
        Self {
            kind: FrameKind::Ping,
            id: None,
            data: Bytes::from(now.to_rfc3339()),
        }
    }

    /// Frame carrying the full backlog
    pub fn snapshot(events: &[Arc<ChangeEvent>]) -> Result<Self> {
        let refs: Vec<&ChangeEvent> = events.iter().map(|e| e.as_ref()).collect();
        Ok(Self {
            kind: FrameKind::Snapshot,
            id: events.last().map(|e| e.sequence),
            data: Bytes::from(serde_json::to_vec(&refs)?),
        })
    }

    /// Encode to wire format
    ///
    /// Multi-line data is split into one `data:` line per line, as the SSE
    /// format requires. The frame ends with a blank line.
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.data.len() + 32);

        buf.put_slice(b"event: ");
        buf.put_slice(self.kind.name().as_bytes());
        buf.put_u8(b'\n');

        if let Some(id) = self.id {
            buf.put_slice(b"id: ");
            buf.put_slice(id.to_string().as_bytes());
            buf.put_u8(b'\n');
        }

        for line in self.data.split(|&b| b == b'\n') {
            buf.put_slice(b"data: ");
            buf.put_slice(line);
            buf.put_u8(b'\n');
        }

        buf.put_u8(b'\n');
        buf.freeze()
    }
}

/// Encode one change event as a `message` frame
pub fn encode_event(event: &ChangeEvent) -> Result<Bytes> {
    Ok(SseFrame::message(event)?.encode())
}

/// Encode a `ping` frame for the given time
pub fn encode_ping(now: DateTime<Utc>) -> Bytes {
    SseFrame::ping(now).encode()
}

/// Encode the backlog as a single `snapshot` frame
pub fn encode_snapshot(events: &[Arc<ChangeEvent>]) -> Result<Bytes> {
    Ok(SseFrame::snapshot(events)?.encode())
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Map, Value};

    use super::*;

    fn sample(sequence: u64, name: &str) -> Arc<ChangeEvent> {
        let mut payload = Map::new();
        payload.insert("name".into(), json!(name));
        Arc::new(ChangeEvent {
            sequence,
            operation_type: "insert".into(),
            payload,
            timestamp: "2025-03-12T15:30:00Z".parse().unwrap(),
        })
    }

    fn data_of(encoded: &Bytes) -> Value {
        let text = std::str::from_utf8(encoded).unwrap();
        let line = text
            .lines()
            .find_map(|l| l.strip_prefix("data: "))
            .unwrap();
        serde_json::from_str(line).unwrap()
    }

    #[test]
    fn test_message_frame() {
        let encoded = encode_event(&sample(3, "Alice")).unwrap();
        let text = std::str::from_utf8(&encoded).unwrap();

        assert!(text.starts_with("event: message\nid: 3\ndata: "));
        assert!(text.ends_with("\n\n"));

        let data = data_of(&encoded);
        assert_eq!(data["operationType"], "insert");
        assert_eq!(data["fullDocument"]["name"], "Alice");
    }

    #[test]
    fn test_ping_frame() {
        let now: DateTime<Utc> = "2025-01-01T00:00:00Z".parse().unwrap();
        let encoded = encode_ping(now);

        assert_eq!(
            &encoded[..],
            b"event: ping\ndata: 2025-01-01T00:00:00+00:00\n\n"
        );
    }

    #[test]
    fn test_snapshot_frame() {
        let events = vec![sample(1, "Alice"), sample(2, "Bob")];
        let encoded = encode_snapshot(&events).unwrap();
        let text = std::str::from_utf8(&encoded).unwrap();

        assert!(text.starts_with("event: snapshot\nid: 2\n"));
        let data = data_of(&encoded);
        assert_eq!(data.as_array().unwrap().len(), 2);
        assert_eq!(data[1]["fullDocument"]["name"], "Bob");
    }

    #[test]
    fn test_empty_snapshot() {
        let encoded = encode_snapshot(&[]).unwrap();
        assert_eq!(&encoded[..], b"event: snapshot\ndata: []\n\n");
    }

    #[test]
    fn test_multiline_data() {
        let frame = SseFrame {
            kind: FrameKind::Message,
            id: None,
            data: Bytes::from_static(b"line one\nline two"),
        };

        assert_eq!(
            &frame.encode()[..],
            b"event: message\ndata: line one\ndata: line two\n\n"
        );
    }
}
