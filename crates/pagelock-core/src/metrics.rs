// Metric names emitted by the lock core
// Descriptions are registered by the server at startup

/// Counter, labelled `outcome` = `acquired` | `contended`
pub const LOCK_ACQUIRE_TOTAL: &str = "page_lock_acquire_total";

/// Counter, labelled `outcome` = `released` | `noop`
pub const LOCK_RELEASE_TOTAL: &str = "page_lock_release_total";

/// Gauge of currently held locks
pub const LOCKS_ACTIVE: &str = "page_lock_active";

/// Gauge of currently registered subscribers
pub const SUBSCRIBERS_ACTIVE: &str = "page_lock_subscribers";

/// Counter of subscribers dropped after a failed write
pub const SUBSCRIBER_PRUNED_TOTAL: &str = "page_lock_subscriber_pruned_total";

/// Counter, labelled `event`
pub const BROADCAST_TOTAL: &str = "page_lock_broadcast_total";
