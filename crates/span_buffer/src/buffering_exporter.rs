//! Memory-buffering export facade called by the tracing runtime.

use crate::backlog::MemoryBacklog;
use crate::batch::SpanBatch;
use crate::error::SendError;
use crate::sender::{NetworkSenderBoxed, OnlineStatus};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::warn;

/// Buffers span batches in memory and forwards them to the network sender
/// whenever the online-status oracle reports connectivity.
///
/// Every exported batch first lands in the backlog; if the device is offline
/// the call succeeds immediately and the spans simply stay buffered. When
/// online, the whole backlog (the new batch plus anything accumulated while
/// offline) is drained into a single send. Delivery failures re-buffer the
/// drained spans and are absorbed - no error from this layer reaches the
/// instrumentation runtime.
///
/// The backlog itself is not synchronized; this facade holds it behind a
/// `tokio::sync::Mutex` across the drain-send-rebuffer sequence, making the
/// multi-producer boundary explicit.
pub struct BufferingExporter {
    backlog: Mutex<MemoryBacklog>,
    status: Arc<dyn OnlineStatus>,
    sender: Arc<dyn NetworkSenderBoxed>,
}

impl BufferingExporter {
    /// Creates an exporter whose backlog holds at most `backlog_capacity`
    /// span records.
    pub fn new(
        backlog_capacity: usize,
        status: Arc<dyn OnlineStatus>,
        sender: Arc<dyn NetworkSenderBoxed>,
    ) -> Self {
        Self {
            backlog: Mutex::new(MemoryBacklog::new(backlog_capacity)),
            status,
            sender,
        }
    }

    /// Buffers `batch` and, if online, drains the backlog to the sender.
    pub async fn export(&self, batch: SpanBatch) -> Result<(), SendError> {
        let mut backlog = self.backlog.lock().await;
        backlog.add_all(batch);
        if !self.status.is_online() {
            return Ok(());
        }
        self.send_drained(&mut backlog).await
    }

    /// Drains any buffered spans if online; with an empty backlog, delegates
    /// to the sender's own flush.
    pub async fn flush(&self) -> Result<(), SendError> {
        let mut backlog = self.backlog.lock().await;
        if backlog.is_empty() {
            return self.sender.flush_boxed().await;
        }
        if !self.status.is_online() {
            return Ok(());
        }
        self.send_drained(&mut backlog).await
    }

    /// Discards buffered-but-undelivered spans and shuts the sender down.
    ///
    /// Losing whatever is still in the backlog here is a deliberate
    /// trade-off; durability across shutdown belongs to the disk path.
    pub async fn shutdown(&self) -> Result<(), SendError> {
        let lost = self.backlog.lock().await.clear();
        if lost > 0 {
            warn!(spans = lost, "discarding undelivered buffered spans at shutdown");
        }
        self.sender.shutdown_boxed().await
    }

    /// Number of records currently buffered.
    pub async fn backlog_len(&self) -> usize {
        self.backlog.lock().await.len()
    }

    async fn send_drained(&self, backlog: &mut MemoryBacklog) -> Result<(), SendError> {
        let drained = backlog.drain();
        if drained.is_empty() {
            return Ok(());
        }
        let records = drained.records;
        match self.sender.send_boxed(records.clone()).await {
            Ok(()) => Ok(()),
            Err(e) => {
                warn!(
                    error = %e,
                    spans = records.len(),
                    "span delivery failed, re-buffering for the next attempt"
                );
                backlog.add_failed(SpanBatch::with_records(records));
                Ok(())
            }
        }
    }
}
