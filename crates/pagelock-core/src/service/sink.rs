// Outbound frame sinks for subscribers

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;

use crate::error::SinkError;

/// Write side of one observer's event stream
///
/// Writes never wait: a sink that cannot take a frame right now reports
/// [`SinkError::Full`] and the caller decides what to do with the subscriber.
#[async_trait]
pub trait FrameSink: Send + Sync {
    /// Hand a complete frame to the observer without blocking.
    fn try_write(&self, frame: Bytes) -> Result<(), SinkError>;

    /// Resolves once the observer has gone away.
    async fn closed(&self);
}

#[async_trait]
impl FrameSink for mpsc::Sender<Bytes> {
    fn try_write(&self, frame: Bytes) -> Result<(), SinkError> {
        self.try_send(frame).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => SinkError::Full,
            mpsc::error::TrySendError::Closed(_) => SinkError::Closed,
        })
    }

    async fn closed(&self) {
        mpsc::Sender::closed(self).await
    }
}

/// Bounded frame channel; the sender is the sink, the receiver feeds the
/// response body.
pub fn channel(capacity: usize) -> (mpsc::Sender<Bytes>, mpsc::Receiver<Bytes>) {
    mpsc::channel(capacity.max(1))
}
