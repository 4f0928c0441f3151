//! Sliding-window throughput estimator.

use std::collections::VecDeque;
use std::time::Instant;

/// Estimates export throughput over a fixed-size sliding window.
///
/// Two parallel windows of at most `window_size` samples record the timestamp
/// and byte size of each [`tick`](RateTracker::tick); the oldest pair is
/// evicted when the window is full. [`ExportCycle`](crate::ExportCycle) uses
/// the sustained rate as admission control against the configured bandwidth
/// ceiling.
#[derive(Debug)]
pub struct RateTracker {
    window_size: usize,
    timestamps: VecDeque<Instant>,
    sizes: VecDeque<u64>,
}

impl RateTracker {
    /// Creates a tracker retaining at most `window_size` samples.
    pub fn new(window_size: usize) -> Self {
        let window_size = window_size.max(2);
        Self {
            window_size,
            timestamps: VecDeque::with_capacity(window_size),
            sizes: VecDeque::with_capacity(window_size),
        }
    }

    /// Records a transfer of `bytes` at the current time.
    pub fn tick(&mut self, bytes: u64) {
        self.tick_at(Instant::now(), bytes);
    }

    /// Records a transfer of `bytes` at an explicit timestamp.
    ///
    /// Exposed so callers (and tests) can supply a deterministic clock;
    /// timestamps are expected to be monotonically non-decreasing.
    pub fn tick_at(&mut self, at: Instant, bytes: u64) {
        if self.timestamps.len() == self.window_size {
            self.timestamps.pop_front();
            self.sizes.pop_front();
        }
        self.timestamps.push_back(at);
        self.sizes.push_back(bytes);
    }

    /// Rate of the most recent transfer: its byte size divided by the time
    /// elapsed since the previous tick. Returns 0.0 with fewer than two
    /// samples or zero elapsed time.
    pub fn latest_block_rate(&self) -> f64 {
        let n = self.timestamps.len();
        if n < 2 {
            return 0.0;
        }
        let elapsed = self.timestamps[n - 1]
            .duration_since(self.timestamps[n - 2])
            .as_secs_f64();
        if elapsed <= 0.0 {
            return 0.0;
        }
        self.sizes[n - 1] as f64 / elapsed
    }

    /// Steady-state rate across the retained window: the sum of all sample
    /// sizes **except the very first** divided by the total elapsed time.
    ///
    /// The first sample's bytes are excluded because no elapsed time is
    /// attributable to them; counting them would overstate an initial burst
    /// as steady-state throughput. Returns 0.0 with fewer than two samples
    /// or zero elapsed time.
    pub fn total_sustained_rate(&self) -> f64 {
        let n = self.timestamps.len();
        if n < 2 {
            return 0.0;
        }
        let elapsed = self.timestamps[n - 1]
            .duration_since(self.timestamps[0])
            .as_secs_f64();
        if elapsed <= 0.0 {
            return 0.0;
        }
        let bytes: u64 = self.sizes.iter().skip(1).sum();
        bytes as f64 / elapsed
    }

    /// Number of samples currently retained.
    pub fn sample_count(&self) -> usize {
        self.timestamps.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_empty_tracker_reports_zero() {
        let tracker = RateTracker::new(6);
        assert_eq!(tracker.latest_block_rate(), 0.0);
        assert_eq!(tracker.total_sustained_rate(), 0.0);
    }

    #[test]
    fn test_single_sample_reports_zero() {
        let mut tracker = RateTracker::new(6);
        tracker.tick_at(Instant::now(), 500);
        assert_eq!(tracker.latest_block_rate(), 0.0);
        assert_eq!(tracker.total_sustained_rate(), 0.0);
    }

    #[test]
    fn test_block_and_sustained_rates() {
        let mut tracker = RateTracker::new(6);
        let t0 = Instant::now();
        tracker.tick_at(t0, 100);
        tracker.tick_at(t0 + Duration::from_secs(5), 200);
        // 200 bytes over 5s
        assert_eq!(tracker.latest_block_rate(), 40.0);

        tracker.tick_at(t0 + Duration::from_secs(10), 300);
        // 300 bytes over 5s
        assert_eq!(tracker.latest_block_rate(), 60.0);
        // (200 + 300) over 10s; the first sample's bytes are excluded
        assert_eq!(tracker.total_sustained_rate(), 50.0);
    }

    #[test]
    fn test_window_evicts_oldest() {
        let mut tracker = RateTracker::new(3);
        let t0 = Instant::now();
        for i in 0..5u64 {
            tracker.tick_at(t0 + Duration::from_secs(i), 100);
        }
        assert_eq!(tracker.sample_count(), 3);
        // Window covers seconds 2..4: 200 bytes over 2s
        assert_eq!(tracker.total_sustained_rate(), 100.0);
    }

    #[test]
    fn test_zero_elapsed_time_guard() {
        let mut tracker = RateTracker::new(6);
        let t0 = Instant::now();
        tracker.tick_at(t0, 100);
        tracker.tick_at(t0, 200);
        assert_eq!(tracker.latest_block_rate(), 0.0);
        assert_eq!(tracker.total_sustained_rate(), 0.0);
    }
}
