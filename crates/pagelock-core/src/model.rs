// Lock records and lock change events
// Shared between the lock table, the broadcaster and the request layer

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default interval between keep-alive frames on an event stream
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

/// Default number of frames buffered per subscriber before it counts as stalled
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// A live lock on a single page
///
/// Records are never mutated in place: re-locking a freed page creates a new
/// record with a fresh timestamp.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockRecord {
    pub page_id: String,
    pub locked_by: String,
    pub locked_at: DateTime<Utc>,
}

impl LockRecord {
    pub fn new(page_id: &str, locked_by: &str) -> Self {
        Self {
            page_id: page_id.to_string(),
            locked_by: locked_by.to_string(),
            locked_at: Utc::now(),
        }
    }
}

/// A change notification pushed to subscribers
///
/// The JSON form carries a `type` tag matching the frame's event name, e.g.
/// `{"type":"page-unlocked","pageId":"page-1"}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum LockEvent {
    /// First frame on every new stream
    Connected,
    #[serde(rename_all = "camelCase")]
    PageLocked {
        page_id: String,
        locked_by: String,
        locked_at: DateTime<Utc>,
    },
    #[serde(rename_all = "camelCase")]
    PageUnlocked { page_id: String },
    /// Keep-alive; travels as a comment frame and has no JSON form
    #[serde(skip)]
    Heartbeat,
}

impl LockEvent {
    pub fn page_locked(record: &LockRecord) -> Self {
        LockEvent::PageLocked {
            page_id: record.page_id.clone(),
            locked_by: record.locked_by.clone(),
            locked_at: record.locked_at,
        }
    }

    pub fn page_unlocked(page_id: &str) -> Self {
        LockEvent::PageUnlocked {
            page_id: page_id.to_string(),
        }
    }

    /// Event name used on the `event:` line of a frame
    pub fn name(&self) -> &'static str {
        match self {
            LockEvent::Connected => "connected",
            LockEvent::PageLocked { .. } => "page-locked",
            LockEvent::PageUnlocked { .. } => "page-unlocked",
            LockEvent::Heartbeat => "heartbeat",
        }
    }

    pub fn page_id(&self) -> Option<&str> {
        match self {
            LockEvent::PageLocked { page_id, .. } | LockEvent::PageUnlocked { page_id } => {
                Some(page_id)
            }
            LockEvent::Connected | LockEvent::Heartbeat => None,
        }
    }
}

impl std::fmt::Display for LockEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.page_id() {
            Some(page_id) => write!(f, "{}({})", self.name(), page_id),
            None => write!(f, "{}", self.name()),
        }
    }
}

/// Tuning for subscriber event streams
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StreamConfig {
    /// Interval between keep-alive frames
    pub heartbeat_interval: Duration,
    /// Frames buffered per subscriber; a subscriber whose buffer is full is pruned
    ///
    /// A burst of more than this many events between two reads of a client's
    /// stream disconnects that client, which then has to reconnect.
    pub channel_capacity: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_record_serializes_camel_case() {
        let record = LockRecord::new("page-1", "alice");
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["pageId"], "page-1");
        assert_eq!(json["lockedBy"], "alice");
        assert!(json["lockedAt"].as_str().unwrap().ends_with('Z'));
    }

    #[test]
    fn test_connected_payload() {
        let json = serde_json::to_string(&LockEvent::Connected).unwrap();
        assert_eq!(json, r#"{"type":"connected"}"#);
    }

    #[test]
    fn test_page_locked_payload() {
        let record = LockRecord::new("page-1", "bob");
        let json = serde_json::to_value(LockEvent::page_locked(&record)).unwrap();

        assert_eq!(json["type"], "page-locked");
        assert_eq!(json["pageId"], "page-1");
        assert_eq!(json["lockedBy"], "bob");
        assert_eq!(
            json["lockedAt"],
            serde_json::to_value(record.locked_at).unwrap()
        );
    }

    #[test]
    fn test_page_unlocked_payload() {
        let json = serde_json::to_string(&LockEvent::page_unlocked("page-9")).unwrap();
        assert_eq!(json, r#"{"type":"page-unlocked","pageId":"page-9"}"#);
    }

    #[test]
    fn test_event_display() {
        assert_eq!(LockEvent::Connected.to_string(), "connected");
        assert_eq!(
            LockEvent::page_unlocked("p1").to_string(),
            "page-unlocked(p1)"
        );
    }

    #[test]
    fn test_stream_config_default() {
        let config = StreamConfig::default();
        assert_eq!(config.heartbeat_interval, Duration::from_secs(15));
        assert_eq!(config.channel_capacity, 64);
    }
}
