//! Error types for delivery and storage operations.

use thiserror::Error;

/// Errors surfaced by a [`NetworkSender`](crate::sender::NetworkSender).
#[derive(Debug, Error, Clone)]
pub enum SendError {
    /// Transport-layer failure (network, collector, HTTP).
    #[error("transport error: {0}")]
    Transport(String),

    /// The sender has been shut down and accepts no further batches.
    #[error("sender is shut down")]
    Shutdown,
}

/// Errors from the on-disk span store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem operation failed.
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Batch could not be encoded for persistence.
    #[error("batch encoding error: {0}")]
    Encode(String),

    /// Persisted bytes could not be decoded back into a batch.
    #[error("batch decoding error: {0}")]
    Decode(String),
}

impl SendError {
    /// Returns `true` if this error may succeed on a later attempt.
    #[inline]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}
