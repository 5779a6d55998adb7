//! Error types for the lock core
//!
//! Contention and redundant unlocks are ordinary outcomes and never show up
//! here. Sink failures are kept in their own type so they cannot leak out of
//! the broadcaster into lock or unlock callers.

/// Errors raised while preparing events for the wire
#[derive(thiserror::Error, Debug)]
pub enum PageLockError {
    #[error("failed to encode event: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Reasons a frame could not be handed to a subscriber's sink
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkError {
    /// The observer went away and the channel is closed
    #[error("subscriber sink closed")]
    Closed,

    /// The observer is not draining its channel fast enough
    #[error("subscriber sink full")]
    Full,
}
