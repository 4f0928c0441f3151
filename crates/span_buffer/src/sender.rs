//! Network sender and online-status abstractions.
//!
//! The actual transport used to deliver encoded spans to a collector is an
//! external collaborator. This module defines the seam: a [`NetworkSender`]
//! trait using native async fn in traits, plus an object-safe
//! [`NetworkSenderBoxed`] mirror for dynamic dispatch.

use crate::error::SendError;
use std::future::Future;
use std::pin::Pin;

/// Delivers encoded span batches to a remote collector.
///
/// # Note on Object Safety
///
/// This trait uses `impl Future` return types which are not object-safe.
/// For dynamic dispatch, use [`NetworkSenderBoxed`].
pub trait NetworkSender: Send + Sync {
    /// Attempts to deliver the given encoded batches in one call.
    fn send(&self, batches: Vec<Vec<u8>>) -> impl Future<Output = Result<(), SendError>> + Send;

    /// Flushes any transport-level buffering.
    fn flush(&self) -> impl Future<Output = Result<(), SendError>> + Send;

    /// Releases transport resources; no sends may follow.
    fn shutdown(&self) -> impl Future<Output = Result<(), SendError>> + Send;

    /// Returns the sender name for debugging.
    fn name(&self) -> &str;
}

/// Object-safe version of [`NetworkSender`] for dynamic dispatch.
pub trait NetworkSenderBoxed: Send + Sync {
    /// Attempts delivery (boxed future for object safety).
    fn send_boxed(
        &self,
        batches: Vec<Vec<u8>>,
    ) -> Pin<Box<dyn Future<Output = Result<(), SendError>> + Send + '_>>;

    /// Flushes any transport-level buffering (boxed).
    fn flush_boxed(&self) -> Pin<Box<dyn Future<Output = Result<(), SendError>> + Send + '_>>;

    /// Releases transport resources (boxed).
    fn shutdown_boxed(&self) -> Pin<Box<dyn Future<Output = Result<(), SendError>> + Send + '_>>;

    /// Returns the sender name for debugging.
    fn name(&self) -> &str;
}

/// Blanket implementation: any NetworkSender can be used as NetworkSenderBoxed
impl<T: NetworkSender> NetworkSenderBoxed for T {
    fn send_boxed(
        &self,
        batches: Vec<Vec<u8>>,
    ) -> Pin<Box<dyn Future<Output = Result<(), SendError>> + Send + '_>> {
        Box::pin(self.send(batches))
    }

    fn flush_boxed(&self) -> Pin<Box<dyn Future<Output = Result<(), SendError>> + Send + '_>> {
        Box::pin(self.flush())
    }

    fn shutdown_boxed(&self) -> Pin<Box<dyn Future<Output = Result<(), SendError>> + Send + '_>> {
        Box::pin(self.shutdown())
    }

    fn name(&self) -> &str {
        NetworkSender::name(self)
    }
}

/// Reports whether the device currently has a usable network path to the
/// collector. Queried on demand by [`BufferingExporter`](crate::BufferingExporter).
pub trait OnlineStatus: Send + Sync {
    /// Returns `true` if exports should be attempted right now.
    fn is_online(&self) -> bool;
}

/// Online-status oracle that always reports connectivity.
pub struct AlwaysOnline;

impl OnlineStatus for AlwaysOnline {
    fn is_online(&self) -> bool {
        true
    }
}

/// Sender that discards all batches (for tests and wiring without a backend).
pub struct NullSender;

impl NullSender {
    pub fn new() -> Self {
        Self
    }
}

impl Default for NullSender {
    fn default() -> Self {
        Self::new()
    }
}

impl NetworkSender for NullSender {
    async fn send(&self, _batches: Vec<Vec<u8>>) -> Result<(), SendError> {
        Ok(())
    }

    async fn flush(&self) -> Result<(), SendError> {
        Ok(())
    }

    async fn shutdown(&self) -> Result<(), SendError> {
        Ok(())
    }

    fn name(&self) -> &str {
        "null"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_null_sender() {
        let sender = NullSender::new();
        assert!(sender.send(vec![vec![1, 2, 3]]).await.is_ok());
        assert!(sender.flush().await.is_ok());
    }

    #[tokio::test]
    async fn test_boxed_dispatch() {
        let sender: Arc<dyn NetworkSenderBoxed> = Arc::new(NullSender::new());
        assert_eq!(sender.name(), "null");
        assert!(sender.send_boxed(vec![vec![0u8; 4]]).await.is_ok());
    }
}
