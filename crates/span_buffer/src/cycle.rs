//! Periodic disk-drain-and-send consumer.
//!
//! One [`ExportCycle`] owns the on-disk drain path end to end: it is the
//! sole reader and deleter of persisted batch files and the sole owner of
//! the rate tracker and retry ledger. The [`ExportScheduler`] confines the
//! cycle to a single spawned task driven by a fixed-period interval, which
//! is why none of this state needs locking and why files are processed
//! strictly sequentially within a cycle.

use crate::config::BufferConfig;
use crate::rate::RateTracker;
use crate::retry::RetryLedger;
use crate::sender::NetworkSenderBoxed;
use crate::store::SpanStore;
use crate::writer::read_batch;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

/// Outcome of one export cycle.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CycleReport {
    /// Files delivered and deleted.
    pub files_sent: usize,
    /// Files permanently dropped after exhausting their retry budget.
    pub files_dropped: usize,
    /// Files whose delivery failed and which remain on disk for a later cycle.
    pub files_failed: usize,
    /// The entire cycle was skipped because the sustained export rate
    /// exceeded the bandwidth ceiling.
    pub bandwidth_deferred: bool,
}

/// Drains persisted span batches from disk and attempts delivery.
pub struct ExportCycle {
    store: Arc<SpanStore>,
    sender: Arc<dyn NetworkSenderBoxed>,
    rate: RateTracker,
    ledger: RetryLedger,
    bandwidth_limit_bytes_per_sec: f64,
    fail_fast: bool,
}

impl ExportCycle {
    pub fn new(
        store: Arc<SpanStore>,
        sender: Arc<dyn NetworkSenderBoxed>,
        config: &BufferConfig,
    ) -> Self {
        Self {
            store,
            sender,
            rate: RateTracker::new(config.rate_window_size),
            ledger: RetryLedger::new(config.max_retries),
            bandwidth_limit_bytes_per_sec: config.bandwidth_limit_bytes_per_sec,
            fail_fast: config.fail_fast,
        }
    }

    /// Runs one cycle: admission control, then sequential per-file
    /// read-send-delete processing.
    pub async fn run_once(&mut self) -> CycleReport {
        let mut report = CycleReport::default();

        // Admission control: skip the whole cycle, touching no files, while
        // the sustained rate is over the ceiling. Per-file throttling is
        // deliberately not done here.
        let sustained = self.rate.total_sustained_rate();
        if sustained > self.bandwidth_limit_bytes_per_sec {
            debug!(
                sustained,
                limit = self.bandwidth_limit_bytes_per_sec,
                "deferring export cycle, bandwidth ceiling exceeded"
            );
            report.bandwidth_deferred = true;
            return report;
        }

        for file in self.store.list_pending().await {
            let key = file.key();

            // An unreadable or corrupt file degrades to an empty batch and
            // is consumed through the normal delivery path and ledger.
            let batch = match read_batch(&file.path).await {
                Ok(batch) => batch,
                Err(e) => {
                    warn!(
                        file = %file.path.display(),
                        error = %e,
                        "unreadable span file, treating as empty batch"
                    );
                    crate::SpanBatch::new()
                }
            };

            let result = self.sender.send_boxed(batch.records).await;
            // The transfer counts against the bandwidth budget whether or
            // not the collector accepted it.
            self.rate.tick(file.size_bytes);

            match result {
                Ok(()) => {
                    self.store.delete(&file.path).await;
                    self.ledger.clear(&key);
                    report.files_sent += 1;
                }
                Err(e) => {
                    if self.ledger.increment_and_check(&key) {
                        warn!(
                            file = %file.path.display(),
                            error = %e,
                            "retry budget exhausted, permanently dropping span file"
                        );
                        self.store.delete(&file.path).await;
                        self.ledger.clear(&key);
                        report.files_dropped += 1;
                    } else {
                        debug!(
                            file = %file.path.display(),
                            attempts = self.ledger.attempts(&key),
                            error = %e,
                            "span file delivery failed, will retry next cycle"
                        );
                        report.files_failed += 1;
                    }
                    if self.fail_fast {
                        break;
                    }
                }
            }
        }

        report
    }
}

/// Drives an [`ExportCycle`] on a fixed period from a dedicated task.
///
/// Shutdown is cooperative: the signal stops future ticks, and an in-flight
/// cycle is allowed to finish before the task exits.
pub struct ExportScheduler {
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl ExportScheduler {
    /// Spawns the scheduling task. The first cycle runs immediately.
    pub fn start(mut cycle: ExportCycle, period: Duration) -> Self {
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();

        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        let report = cycle.run_once().await;
                        if report.files_sent > 0 || report.files_dropped > 0 {
                            debug!(
                                sent = report.files_sent,
                                dropped = report.files_dropped,
                                failed = report.files_failed,
                                "export cycle complete"
                            );
                        }
                    }
                    _ = &mut shutdown_rx => break,
                }
            }
        });

        Self {
            shutdown_tx: Some(shutdown_tx),
            task: Some(task),
        }
    }

    /// Stops future ticks and waits for the task (and any in-flight cycle)
    /// to finish.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}
