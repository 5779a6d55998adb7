// Lock table, subscriber registry and the service facade over both

pub mod broadcaster;
pub mod lock_table;
pub mod page_lock;
pub mod sink;
pub mod subscriber;

// Re-export commonly used types
pub use broadcaster::Broadcaster;
pub use lock_table::LockTable;
pub use page_lock::PageLockService;
pub use sink::{FrameSink, channel};
pub use subscriber::{SubscriberId, SubscriberState, Subscription};
