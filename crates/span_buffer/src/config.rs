//! Configuration for the buffering layer.

use std::time::Duration;

/// Configuration for span buffering, persistence, and export behavior.
#[derive(Debug, Clone)]
pub struct BufferConfig {
    /// Ceiling on total bytes of persisted span files, in MiB.
    ///
    /// Default: 1
    pub max_disk_usage_mb: u64,

    /// Delivery attempts per persisted file before it is permanently dropped.
    ///
    /// Default: 10
    pub max_retries: u32,

    /// Period between export cycles.
    ///
    /// Default: 5s
    pub export_interval: Duration,

    /// Self-imposed bandwidth ceiling used as admission control for export
    /// cycles. A cycle is skipped entirely while the sustained rate exceeds
    /// this limit.
    ///
    /// Default: 15 KiB/s
    pub bandwidth_limit_bytes_per_sec: f64,

    /// Maximum span records held in the in-memory backlog; the oldest
    /// entries are discarded once this is exceeded.
    ///
    /// Default: 100
    pub memory_backlog_capacity: usize,

    /// Number of samples retained by the sliding-window rate tracker.
    ///
    /// Default: 6
    pub rate_window_size: usize,

    /// Stop an export cycle at the first delivery failure instead of
    /// attempting the remaining files.
    ///
    /// Default: true
    pub fail_fast: bool,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            max_disk_usage_mb: 1,
            max_retries: 10,
            export_interval: Duration::from_secs(5),
            bandwidth_limit_bytes_per_sec: 15.0 * 1024.0,
            memory_backlog_capacity: 100,
            rate_window_size: 6,
            fail_fast: true,
        }
    }
}

impl BufferConfig {
    /// Disk quota expressed in bytes.
    pub fn max_disk_usage_bytes(&self) -> u64 {
        self.max_disk_usage_mb * 1024 * 1024
    }

    /// Sets the disk quota in MiB.
    pub fn with_max_disk_usage_mb(mut self, mb: u64) -> Self {
        self.max_disk_usage_mb = mb;
        self
    }

    /// Sets the per-file retry cutoff.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Sets the export cycle period.
    pub fn with_export_interval(mut self, interval: Duration) -> Self {
        self.export_interval = interval;
        self
    }

    /// Sets the bandwidth ceiling in bytes per second.
    pub fn with_bandwidth_limit(mut self, bytes_per_sec: f64) -> Self {
        self.bandwidth_limit_bytes_per_sec = bytes_per_sec;
        self
    }

    /// Sets the in-memory backlog capacity.
    pub fn with_memory_backlog_capacity(mut self, capacity: usize) -> Self {
        self.memory_backlog_capacity = capacity;
        self
    }

    /// Sets the rate tracker window size.
    pub fn with_rate_window_size(mut self, window: usize) -> Self {
        self.rate_window_size = window;
        self
    }

    /// Controls whether an export cycle stops at the first failure.
    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }
}
