//! Server-sent-event framing for lock change streams
//!
//! Every event travels as one text frame terminated by a blank line:
//!
//! ```text
//! event: page-locked
//! data: {"type":"page-locked","pageId":"page-1","lockedBy":"alice","lockedAt":"..."}
//!
//! ```
//!
//! Heartbeats are comment-only frames (`: heartbeat`) that carry no event or
//! data line, so standard event-source clients ignore them.

use bytes::{Bytes, BytesMut};

use crate::error::PageLockError;
use crate::model::LockEvent;

/// Comment frame written on every heartbeat tick
pub const HEARTBEAT_FRAME: &[u8] = b": heartbeat\n\n";

const EVENT_PREFIX: &str = "event:";
const DATA_PREFIX: &str = "data:";
const FRAME_TERMINATOR: &str = "\n\n";

/// Encode an event into a complete frame.
///
/// The event is serialized exactly once; the returned buffer is cheap to clone
/// for every subscriber.
pub fn encode(event: &LockEvent) -> Result<Bytes, PageLockError> {
    if matches!(event, LockEvent::Heartbeat) {
        return Ok(heartbeat());
    }

    let payload = serde_json::to_string(event)?;
    let mut frame = BytesMut::with_capacity(payload.len() + event.name().len() + 16);
    frame.extend_from_slice(EVENT_PREFIX.as_bytes());
    frame.extend_from_slice(b" ");
    frame.extend_from_slice(event.name().as_bytes());
    frame.extend_from_slice(b"\n");
    frame.extend_from_slice(DATA_PREFIX.as_bytes());
    frame.extend_from_slice(b" ");
    frame.extend_from_slice(payload.as_bytes());
    frame.extend_from_slice(FRAME_TERMINATOR.as_bytes());
    Ok(frame.freeze())
}

/// Encode several events back to back into one buffer.
pub fn encode_all<'a, I>(events: I) -> Result<Bytes, PageLockError>
where
    I: IntoIterator<Item = &'a LockEvent>,
{
    let mut buffer = BytesMut::new();
    for event in events {
        buffer.extend_from_slice(&encode(event)?);
    }
    Ok(buffer.freeze())
}

pub fn heartbeat() -> Bytes {
    Bytes::from_static(HEARTBEAT_FRAME)
}

/// A decoded frame as seen by a stream consumer
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Frame {
    pub event: Option<String>,
    pub data: Option<String>,
    pub comment: Option<String>,
}

impl Frame {
    pub fn is_heartbeat(&self) -> bool {
        self.event.is_none() && self.data.is_none() && self.comment.is_some()
    }

    /// Parse the data line back into an event.
    pub fn to_event(&self) -> Option<LockEvent> {
        if self.is_heartbeat() {
            return Some(LockEvent::Heartbeat);
        }
        self.data
            .as_deref()
            .and_then(|data| serde_json::from_str(data).ok())
    }

    fn parse(block: &str) -> Option<Self> {
        let mut frame = Frame::default();
        for line in block.lines() {
            if let Some(value) = line.strip_prefix(EVENT_PREFIX) {
                frame.event = Some(value.trim_start().to_string());
            } else if let Some(value) = line.strip_prefix(DATA_PREFIX) {
                frame.data = Some(value.trim_start().to_string());
            } else if let Some(value) = line.strip_prefix(':') {
                frame.comment = Some(value.trim_start().to_string());
            }
        }

        if frame == Frame::default() {
            None
        } else {
            Some(frame)
        }
    }
}

/// Incremental decoder for a frame stream split across arbitrary chunks
#[derive(Debug, Default)]
pub struct FrameDecoder {
    pending: String,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and return every frame it completes.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Frame> {
        self.pending.push_str(&String::from_utf8_lossy(chunk));

        let mut frames = Vec::new();
        while let Some(end) = self.pending.find(FRAME_TERMINATOR) {
            let block: String = self.pending.drain(..end + FRAME_TERMINATOR.len()).collect();
            if let Some(frame) = Frame::parse(&block) {
                frames.push(frame);
            }
        }
        frames
    }

    /// Bytes received that do not yet form a complete frame.
    pub fn pending(&self) -> &str {
        &self.pending
    }
}
