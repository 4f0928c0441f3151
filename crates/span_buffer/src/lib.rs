//! Durable Span Buffering Layer
//!
//! The durability layer of a client telemetry agent: accepts batches of
//! completed, already-encoded trace spans from an instrumentation runtime and
//! guarantees they eventually reach a remote collector - across process
//! restarts, network outages, and collector failures - while respecting a
//! fixed on-device storage budget and a self-imposed bandwidth ceiling.
//!
//! Two intake paths feed one drain path:
//!
//! - [`BufferingExporter`]: bounded in-memory backlog, sent whenever the
//!   online-status oracle reports connectivity; never persisted.
//! - [`DiskBufferingExporter`]: crash-safe persistence (tmp-then-rename)
//!   under a storage quota enforced by [`StorageQuotaEnforcer`].
//! - [`ExportCycle`] / [`ExportScheduler`]: the periodic consumer that drains
//!   persisted files, with retry bookkeeping ([`RetryLedger`]) and
//!   sliding-window bandwidth admission control ([`RateTracker`]).
//!
//! Span encoding, trace semantics, and the transport protocol are external
//! concerns, modeled by the opaque [`NetworkSender`] seam.

pub mod backlog;
pub mod batch;
pub mod buffering_exporter;
pub mod config;
pub mod cycle;
pub mod error;
pub mod quota;
pub mod rate;
pub mod retry;
pub mod sender;
pub mod store;
pub mod writer;

// Re-export main types
pub use backlog::MemoryBacklog;
pub use batch::SpanBatch;
pub use buffering_exporter::BufferingExporter;
pub use config::BufferConfig;
pub use cycle::{CycleReport, ExportCycle, ExportScheduler};
pub use error::{SendError, StoreError};
pub use quota::StorageQuotaEnforcer;
pub use rate::RateTracker;
pub use retry::RetryLedger;
pub use sender::{AlwaysOnline, NetworkSender, NetworkSenderBoxed, NullSender, OnlineStatus};
pub use store::{PersistedFile, SpanStore, StoragePolicy};
pub use writer::{read_batch, DiskBufferingExporter, DurableWriter};
