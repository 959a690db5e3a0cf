//! SSE writer sink
//!
//! Bridges a [`Subscription`](crate::registry::Subscription) to any async
//! byte stream (a TCP socket, an HTTP body channel, a test buffer).

use chrono::Utc;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::error::Result;
use crate::event::ChangeEvent;
use crate::registry::EventSink;

use super::frame::SseFrame;

/// [`EventSink`] that writes each event as an SSE `message` frame
pub struct SseSink<W> {
    writer: W,
    frames_sent: u64,
    bytes_sent: u64,
}

impl<W> SseSink<W>
where
    W: AsyncWrite + Unpin + Send,
{
    /// Wrap a writer
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            frames_sent: 0,
            bytes_sent: 0,
        }
    }

    /// Write an arbitrary frame and flush
    pub async fn send_frame(&mut self, frame: &SseFrame) -> Result<()> {
        let encoded = frame.encode();
        self.writer.write_all(&encoded).await?;
        self.writer.flush().await?;

        self.frames_sent += 1;
        self.bytes_sent += encoded.len() as u64;
        Ok(())
    }

    /// Write a keep-alive frame stamped with the current time
    pub async fn ping(&mut self) -> Result<()> {
        self.send_frame(&SseFrame::ping(Utc::now())).await
    }

    /// Frames written so far
    pub fn frames_sent(&self) -> u64 {
        self.frames_sent
    }

    /// Bytes written so far
    pub fn bytes_sent(&self) -> u64 {
        self.bytes_sent
    }

    /// Unwrap the inner writer
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W> EventSink for SseSink<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn deliver(&mut self, event: &ChangeEvent) -> Result<()> {
        let frame = SseFrame::message(event)?;
        self.send_frame(&frame).await
    }
}
