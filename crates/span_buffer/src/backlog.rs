//! Bounded in-memory FIFO for spans awaiting the next export attempt.

use crate::batch::SpanBatch;
use std::collections::VecDeque;
use tracing::warn;

/// Bounded drop-oldest FIFO of encoded span records, never persisted.
///
/// Holds spans between export attempts: fresh spans while the device is
/// offline, and previously drained spans that failed delivery. When an
/// insertion pushes the backlog past capacity, the **oldest** records are
/// discarded first; the loss is silent but logged.
///
/// Not internally synchronized. The single-writer contract belongs to the
/// caller; [`BufferingExporter`](crate::BufferingExporter) confines this
/// structure behind a `tokio::sync::Mutex`.
#[derive(Debug)]
pub struct MemoryBacklog {
    entries: VecDeque<Vec<u8>>,
    capacity: usize,
    dropped_total: u64,
}

impl MemoryBacklog {
    /// Creates a backlog holding at most `capacity` span records.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
            dropped_total: 0,
        }
    }

    /// Appends all records of `batch` to the tail.
    pub fn add_all(&mut self, batch: SpanBatch) {
        self.append(batch, "buffering spans");
    }

    /// Re-appends records whose delivery failed so they are retried on the
    /// next export or flush.
    pub fn add_failed(&mut self, batch: SpanBatch) {
        self.append(batch, "re-buffering failed spans");
    }

    fn append(&mut self, batch: SpanBatch, context: &str) {
        self.entries.extend(batch.records);
        let overflow = self.entries.len().saturating_sub(self.capacity);
        if overflow > 0 {
            self.entries.drain(..overflow);
            self.dropped_total += overflow as u64;
            warn!(
                dropped = overflow,
                capacity = self.capacity,
                "backlog over capacity while {context}, discarding oldest spans"
            );
        }
    }

    /// Atomically returns and empties the entire backlog, FIFO order preserved.
    pub fn drain(&mut self) -> SpanBatch {
        SpanBatch::with_records(self.entries.drain(..).collect())
    }

    /// Returns `true` if no records are buffered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of buffered records.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Discards all buffered records, returning how many were lost.
    pub fn clear(&mut self) -> usize {
        let lost = self.entries.len();
        self.entries.clear();
        lost
    }

    /// Total records ever discarded due to capacity overflow.
    pub fn dropped_total(&self) -> u64 {
        self.dropped_total
    }
}
