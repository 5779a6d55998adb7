//! Pagelock Core - page locking and change notification
//!
//! This crate provides:
//! - A concurrent lock table with first-come-first-served test-and-set
//! - A subscriber registry that fans lock changes out to connected observers
//! - The server-sent-event frame format used on the wire
//! - [`PageLockService`], the facade the request layer talks to

pub mod error;
pub mod frame;
pub mod metrics;
pub mod model;
pub mod service;

// Re-export commonly used types
pub use error::{PageLockError, SinkError};
pub use model::{LockEvent, LockRecord, StreamConfig};
pub use service::{
    Broadcaster, FrameSink, LockTable, PageLockService, SubscriberId, SubscriberState,
    Subscription,
};
