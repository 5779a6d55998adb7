//! Subscriber registry and lock change fan-out
//!
//! The broadcaster keeps one entry per connected observer and pushes every lock
//! change to all of them. Writes never wait on an observer: a sink that is closed
//! or has a full buffer is pruned on the spot and the rest of the fan-out carries
//! on.
//!
//! Each subscriber's long-lived task is driven by [`Broadcaster::run`], which
//! emits heartbeats and owns the subscriber's removal from the registry.

use std::sync::Arc;
use std::time::Duration;

use bytes::BytesMut;
use dashmap::DashMap;
use metrics::{counter, gauge};
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::lock_table::LockTable;
use super::sink::FrameSink;
use super::subscriber::{SubscriberId, SubscriberState, Subscriber, Subscription};
use crate::error::SinkError;
use crate::frame;
use crate::metrics::{BROADCAST_TOTAL, SUBSCRIBERS_ACTIVE, SUBSCRIBER_PRUNED_TOTAL};
use crate::model::{LockEvent, StreamConfig};

const MIN_HEARTBEAT_INTERVAL: Duration = Duration::from_millis(10);

/// Fan-out of lock changes to every connected observer
pub struct Broadcaster {
    subscribers: Arc<DashMap<SubscriberId, Subscriber>>,
    shutdown: CancellationToken,
    config: StreamConfig,
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new(StreamConfig::default())
    }
}

impl Broadcaster {
    pub fn new(config: StreamConfig) -> Self {
        Self {
            subscribers: Arc::new(DashMap::new()),
            shutdown: CancellationToken::new(),
            config,
        }
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// Register an observer and send it the catch-up burst.
    ///
    /// The burst is one `connected` frame followed by a `page-locked` frame per
    /// lock currently in `table`. The subscriber is registered before the table
    /// is read, and anything broadcast while the burst is assembled is written
    /// right after it, so no change is lost and no change for a page overtakes
    /// that page's catch-up frame.
    ///
    /// The returned subscription is `Active` on success. If the burst cannot be
    /// written it is already `Closing` and unregistered.
    pub fn subscribe(&self, sink: Arc<dyn FrameSink>, table: &LockTable) -> Subscription {
        let id = SubscriberId::new();
        let token = self.shutdown.child_token();
        let subscriber = Subscriber::connecting(sink.clone(), token.clone());

        let mut subscription = Subscription {
            id,
            sink,
            token,
            state: SubscriberState::Connecting,
            registry: self.subscribers.clone(),
        };

        self.subscribers.insert(id, subscriber.clone());

        let mut burst = BytesMut::new();
        let mut locks = 0usize;
        append_frame(&mut burst, &LockEvent::Connected);
        table.for_each(|record| {
            append_frame(&mut burst, &LockEvent::page_locked(record));
            locks += 1;
        });

        match subscriber.flush_catch_up(burst) {
            Ok(()) => {
                subscription.state = SubscriberState::Active;
                gauge!(SUBSCRIBERS_ACTIVE).set(self.subscribers.len() as f64);
                info!(subscriber_id = %id, locks = locks, "Subscriber connected");
            }
            Err(e) => {
                subscription.state = SubscriberState::Closing;
                self.prune(&id, e);
            }
        }

        subscription
    }

    /// Push an event to every registered subscriber.
    ///
    /// The event is encoded once. Subscribers whose sink rejects the frame are
    /// removed after the fan-out; nothing is reported to the caller beyond the
    /// number of subscribers that accepted it.
    pub fn broadcast(&self, event: &LockEvent) -> usize {
        let frame = match frame::encode(event) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(event = %event, error = %e, "Dropping event that failed to encode");
                return 0;
            }
        };

        let mut delivered = 0usize;
        let mut failed = Vec::new();
        for entry in self.subscribers.iter() {
            match entry.value().deliver(frame.clone()) {
                Ok(()) => delivered += 1,
                Err(e) => failed.push((*entry.key(), e)),
            }
        }

        // Registry shards are still read-locked inside the loop above
        for (id, reason) in failed {
            self.prune(&id, reason);
        }

        counter!(BROADCAST_TOTAL, "event" => event.name()).increment(1);
        debug!(event = %event, delivered = delivered, "Broadcast lock event");
        delivered
    }

    /// Remove a subscriber. Returns false if it was not registered.
    pub fn unsubscribe(&self, id: &SubscriberId) -> bool {
        match self.subscribers.remove(id) {
            Some((_, subscriber)) => {
                subscriber.token.cancel();
                gauge!(SUBSCRIBERS_ACTIVE).set(self.subscribers.len() as f64);
                info!(subscriber_id = %id, "Subscriber disconnected");
                true
            }
            None => false,
        }
    }

    fn prune(&self, id: &SubscriberId, reason: SinkError) {
        if let Some((_, subscriber)) = self.subscribers.remove(id) {
            subscriber.token.cancel();
            let reason_label = match reason {
                SinkError::Closed => "closed",
                SinkError::Full => "full",
            };
            counter!(SUBSCRIBER_PRUNED_TOTAL, "reason" => reason_label).increment(1);
            gauge!(SUBSCRIBERS_ACTIVE).set(self.subscribers.len() as f64);
            warn!(subscriber_id = %id, reason = %reason, "Pruned subscriber after failed write");
        }
    }

    /// Serve a subscription until the observer leaves.
    ///
    /// Emits a heartbeat frame every `heartbeat_interval` and returns when
    /// `cancel` fires, the subscriber is pruned, the broadcaster shuts down, the
    /// sink closes, or a heartbeat cannot be written. The subscriber is then
    /// unregistered exactly once and the subscription ends `Closed`.
    pub async fn run(&self, subscription: &mut Subscription, cancel: &CancellationToken) {
        if subscription.state == SubscriberState::Active {
            let period = self.config.heartbeat_interval.max(MIN_HEARTBEAT_INTERVAL);
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let heartbeat = frame::heartbeat();

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        debug!(subscriber_id = %subscription.id, "Subscriber cancelled");
                        break;
                    }
                    _ = subscription.token.cancelled() => {
                        debug!(subscriber_id = %subscription.id, "Subscriber stopped by broadcaster");
                        break;
                    }
                    _ = subscription.sink.closed() => {
                        debug!(subscriber_id = %subscription.id, "Subscriber sink closed");
                        break;
                    }
                    _ = ticker.tick() => {
                        if let Err(e) = subscription.sink.try_write(heartbeat.clone()) {
                            debug!(subscriber_id = %subscription.id, error = %e, "Heartbeat failed");
                            break;
                        }
                    }
                }
            }
        }

        subscription.state = SubscriberState::Closing;
        self.unsubscribe(&subscription.id);
        subscription.state = SubscriberState::Closed;
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Stop every current and future subscription.
    pub fn shutdown(&self) {
        info!(subscribers = self.subscribers.len(), "Shutting down lock event broadcaster");
        self.shutdown.cancel();
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.is_cancelled()
    }
}

fn append_frame(buffer: &mut BytesMut, event: &LockEvent) {
    match frame::encode(event) {
        Ok(frame) => buffer.extend_from_slice(&frame),
        Err(e) => warn!(event = %event, error = %e, "Skipping catch-up event that failed to encode"),
    }
}
