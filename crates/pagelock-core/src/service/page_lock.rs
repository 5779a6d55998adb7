// Page lock service
// Ties the lock table to the broadcaster so every change reaches connected observers

use std::sync::Arc;

use metrics::{counter, gauge};
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::broadcaster::Broadcaster;
use super::lock_table::LockTable;
use super::sink::FrameSink;
use super::subscriber::SubscriberId;
use crate::metrics::{LOCK_ACQUIRE_TOTAL, LOCK_RELEASE_TOTAL, LOCKS_ACTIVE};
use crate::model::{LockEvent, LockRecord, StreamConfig};

/// Entry point for the request layer
///
/// Holds no lock state of its own. Lock and unlock succeed or fail on table
/// state alone; subscriber problems never surface here.
pub struct PageLockService {
    table: LockTable,
    broadcaster: Broadcaster,
}

impl Default for PageLockService {
    fn default() -> Self {
        Self::new(StreamConfig::default())
    }
}

impl PageLockService {
    pub fn new(config: StreamConfig) -> Self {
        info!(
            heartbeat_interval_ms = config.heartbeat_interval.as_millis() as u64,
            channel_capacity = config.channel_capacity,
            "PageLockService initialized"
        );
        Self {
            table: LockTable::new(),
            broadcaster: Broadcaster::new(config),
        }
    }

    /// Lock a page for `holder`.
    ///
    /// Returns `true` if the lock was taken, `false` if the page is already
    /// locked by anyone, including `holder`.
    pub fn lock(&self, page_id: &str, holder: &str) -> bool {
        self.try_lock(page_id, holder).is_some()
    }

    /// Lock a page and return the new record.
    ///
    /// The `page-locked` event is broadcast before this returns.
    pub fn try_lock(&self, page_id: &str, holder: &str) -> Option<LockRecord> {
        let record = self.table.try_acquire_with(page_id, holder, |record| {
            self.broadcaster.broadcast(&LockEvent::page_locked(record));
        });

        let outcome = if record.is_some() { "acquired" } else { "contended" };
        counter!(LOCK_ACQUIRE_TOTAL, "outcome" => outcome).increment(1);
        gauge!(LOCKS_ACTIVE).set(self.table.len() as f64);
        record
    }

    /// Unlock a page. Unlocking a free page is a no-op.
    ///
    /// Returns `true` if a lock was removed, in which case the `page-unlocked`
    /// event was broadcast before this returns.
    pub fn unlock(&self, page_id: &str) -> bool {
        let released = self
            .table
            .release_with(page_id, |record| {
                self.broadcaster
                    .broadcast(&LockEvent::page_unlocked(&record.page_id));
            })
            .is_some();

        let outcome = if released { "released" } else { "noop" };
        counter!(LOCK_RELEASE_TOTAL, "outcome" => outcome).increment(1);
        gauge!(LOCKS_ACTIVE).set(self.table.len() as f64);
        released
    }

    /// Snapshot of every live lock
    pub fn locks(&self) -> Vec<LockRecord> {
        self.table.snapshot()
    }

    pub fn lock_of(&self, page_id: &str) -> Option<LockRecord> {
        self.table.get(page_id)
    }

    /// Serve one observer until `cancel` fires or the observer goes away.
    ///
    /// Writes the catch-up burst, then heartbeats and live events, to `sink`.
    /// Returns the id the observer was registered under once it has been
    /// removed again.
    pub async fn stream(&self, sink: Arc<dyn FrameSink>, cancel: CancellationToken) -> SubscriberId {
        let mut subscription = self.broadcaster.subscribe(sink, &self.table);
        self.broadcaster.run(&mut subscription, &cancel).await;
        subscription.id()
    }

    pub fn subscriber_count(&self) -> usize {
        self.broadcaster.subscriber_count()
    }

    pub fn config(&self) -> &StreamConfig {
        self.broadcaster.config()
    }

    /// End every stream; locks are left in place.
    pub fn shutdown(&self) {
        self.broadcaster.shutdown();
    }

    pub fn is_shutdown(&self) -> bool {
        self.broadcaster.is_shutdown()
    }
}
