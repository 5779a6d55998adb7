// Subscriber identity and lifecycle

use std::fmt;
use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use dashmap::DashMap;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::sink::FrameSink;
use crate::error::SinkError;

/// Opaque identity of one connected observer
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriberId(Uuid);

impl SubscriberId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle of a subscription
///
/// `Connecting -> Active -> Closing -> Closed`. Only `Active` subscribers
/// receive broadcasts; a subscriber that fails a write goes straight to
/// `Closing`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubscriberState {
    Connecting,
    Active,
    Closing,
    Closed,
}

impl fmt::Display for SubscriberState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SubscriberState::Connecting => "connecting",
            SubscriberState::Active => "active",
            SubscriberState::Closing => "closing",
            SubscriberState::Closed => "closed",
        };
        write!(f, "{}", s)
    }
}

/// Registry entry for one observer
#[derive(Clone)]
pub(crate) struct Subscriber {
    pub(crate) sink: Arc<dyn FrameSink>,
    pub(crate) token: CancellationToken,
    /// Live frames held back while the catch-up burst is assembled
    backlog: Arc<Mutex<Option<BytesMut>>>,
}

impl Subscriber {
    /// New entry that buffers live frames until [`flush_catch_up`](Self::flush_catch_up).
    pub(crate) fn connecting(sink: Arc<dyn FrameSink>, token: CancellationToken) -> Self {
        Self {
            sink,
            token,
            backlog: Arc::new(Mutex::new(Some(BytesMut::new()))),
        }
    }

    pub(crate) fn deliver(&self, frame: Bytes) -> Result<(), SinkError> {
        let mut backlog = self.backlog.lock();
        if let Some(pending) = backlog.as_mut() {
            pending.extend_from_slice(&frame);
            return Ok(());
        }
        drop(backlog);
        self.sink.try_write(frame)
    }

    /// Write the catch-up burst followed by anything broadcast meanwhile, then
    /// switch to direct delivery.
    pub(crate) fn flush_catch_up(&self, mut burst: BytesMut) -> Result<(), SinkError> {
        let mut backlog = self.backlog.lock();
        if let Some(pending) = backlog.take() {
            burst.extend_from_slice(&pending);
        }
        self.sink.try_write(burst.freeze())
    }
}

/// Handle owned by the task serving one observer
///
/// Dropping the handle removes the subscriber from the registry if it is still
/// registered, so an aborted stream task cannot leak an entry.
pub struct Subscription {
    pub(crate) id: SubscriberId,
    pub(crate) sink: Arc<dyn FrameSink>,
    pub(crate) token: CancellationToken,
    pub(crate) state: SubscriberState,
    pub(crate) registry: Arc<DashMap<SubscriberId, Subscriber>>,
}

impl Subscription {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    pub fn state(&self) -> SubscriberState {
        self.state
    }

    /// Cancelled when the subscriber is pruned or the broadcaster shuts down
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn is_registered(&self) -> bool {
        self.registry.contains_key(&self.id)
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("state", &self.state)
            .finish()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if self.state != SubscriberState::Closed {
            self.registry.remove(&self.id);
            self.token.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::sink::channel;

    fn connecting_subscriber() -> (Subscriber, tokio::sync::mpsc::Receiver<Bytes>) {
        let (tx, rx) = channel(4);
        let subscriber = Subscriber::connecting(Arc::new(tx), CancellationToken::new());
        (subscriber, rx)
    }

    #[test]
    fn test_frames_during_catch_up_follow_the_burst() {
        let (subscriber, mut rx) = connecting_subscriber();

        subscriber.deliver(Bytes::from_static(b"live-1\n\n")).unwrap();
        subscriber.deliver(Bytes::from_static(b"live-2\n\n")).unwrap();
        // Nothing reaches the sink before the burst
        assert!(rx.try_recv().is_err());

        let burst = BytesMut::from(&b"burst\n\n"[..]);
        subscriber.flush_catch_up(burst).unwrap();

        let chunk = rx.try_recv().unwrap();
        assert_eq!(&chunk[..], b"burst\n\nlive-1\n\nlive-2\n\n");
        assert!(rx.try_recv().is_err());

        // After the flush frames go straight through
        subscriber.deliver(Bytes::from_static(b"live-3\n\n")).unwrap();
        assert_eq!(&rx.try_recv().unwrap()[..], b"live-3\n\n");
    }

    #[test]
    fn test_catch_up_without_backlog() {
        let (subscriber, mut rx) = connecting_subscriber();

        subscriber.flush_catch_up(BytesMut::from(&b"burst\n\n"[..])).unwrap();
        assert_eq!(&rx.try_recv().unwrap()[..], b"burst\n\n");
    }

    #[test]
    fn test_flush_to_closed_sink_fails() {
        let (subscriber, rx) = connecting_subscriber();
        subscriber.deliver(Bytes::from_static(b"live\n\n")).unwrap();
        drop(rx);

        let result = subscriber.flush_catch_up(BytesMut::from(&b"burst\n\n"[..]));
        assert_eq!(result, Err(SinkError::Closed));
    }

    #[test]
    fn test_subscriber_ids_are_unique() {
        let a = SubscriberId::new();
        let b = SubscriberId::new();
        assert_ne!(a, b);
        assert_eq!(a.to_string().len(), 36);
    }

    #[test]
    fn test_state_display() {
        assert_eq!(SubscriberState::Connecting.to_string(), "connecting");
        assert_eq!(SubscriberState::Closed.to_string(), "closed");
    }
}
