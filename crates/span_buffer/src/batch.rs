use serde::{Deserialize, Serialize};

/// An ordered batch of completed span records.
///
/// Records are opaque to this layer: each entry is an already-encoded span
/// payload produced by the instrumentation runtime. Encoding and trace
/// semantics are external concerns; this crate only moves bytes durably.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpanBatch {
    /// Encoded span payloads, in production order.
    pub records: Vec<Vec<u8>>,
}

impl SpanBatch {
    /// Creates a new empty batch.
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
        }
    }

    /// Creates a batch from the given encoded records.
    pub fn with_records(records: Vec<Vec<u8>>) -> Self {
        Self { records }
    }

    /// Appends a single encoded record to the batch.
    pub fn push(&mut self, record: Vec<u8>) {
        self.records.push(record);
    }

    /// Appends all records from `other`, preserving order.
    pub fn extend(&mut self, other: SpanBatch) {
        self.records.extend(other.records);
    }

    /// Returns the number of records in the batch.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if the batch contains no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Total payload size in bytes across all records.
    pub fn byte_size(&self) -> u64 {
        self.records.iter().map(|r| r.len() as u64).sum()
    }
}
