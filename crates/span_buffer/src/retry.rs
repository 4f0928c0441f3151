//! Per-file delivery attempt bookkeeping.

use std::collections::HashMap;

/// Tracks failed delivery attempts per persisted file, with a cutoff.
///
/// Keys are stable path strings rather than filesystem handles. A record is
/// created on the first failure, incremented on each subsequent failure, and
/// removed on [`clear`](RetryLedger::clear) - which callers invoke exactly
/// when the corresponding file is deleted, whether delivered or dropped.
#[derive(Debug)]
pub struct RetryLedger {
    attempts: HashMap<String, u32>,
    max_attempts: u32,
}

impl RetryLedger {
    /// Creates a ledger that reports the cutoff once a key reaches
    /// `max_attempts` failures.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            attempts: HashMap::new(),
            max_attempts: max_attempts.max(1),
        }
    }

    /// Records one more failed attempt for `key` and returns `true` once the
    /// attempt count has reached the configured maximum.
    pub fn increment_and_check(&mut self, key: &str) -> bool {
        let count = self.attempts.entry(key.to_owned()).or_insert(0);
        *count += 1;
        *count >= self.max_attempts
    }

    /// Removes the record for `key`, if any.
    pub fn clear(&mut self, key: &str) {
        self.attempts.remove(key);
    }

    /// Current attempt count for `key` (0 if no record exists).
    pub fn attempts(&self, key: &str) -> u32 {
        self.attempts.get(key).copied().unwrap_or(0)
    }

    /// Number of files currently carrying a retry record.
    pub fn len(&self) -> usize {
        self.attempts.len()
    }

    /// Returns `true` if no file carries a retry record.
    pub fn is_empty(&self) -> bool {
        self.attempts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cutoff_reached_on_nth_failure() {
        let mut ledger = RetryLedger::new(3);
        assert!(!ledger.increment_and_check("a"));
        assert!(!ledger.increment_and_check("a"));
        assert!(ledger.increment_and_check("a"));
        assert_eq!(ledger.attempts("a"), 3);
    }

    #[test]
    fn test_clear_removes_record() {
        let mut ledger = RetryLedger::new(5);
        ledger.increment_and_check("a");
        ledger.increment_and_check("b");
        assert_eq!(ledger.len(), 2);

        ledger.clear("a");
        assert_eq!(ledger.attempts("a"), 0);
        assert_eq!(ledger.len(), 1);

        // A cleared key starts counting from scratch.
        assert!(!ledger.increment_and_check("a"));
        assert_eq!(ledger.attempts("a"), 1);
    }

    #[test]
    fn test_keys_are_independent() {
        let mut ledger = RetryLedger::new(2);
        assert!(!ledger.increment_and_check("a"));
        assert!(!ledger.increment_and_check("b"));
        assert!(ledger.increment_and_check("a"));
        assert_eq!(ledger.attempts("b"), 1);
    }
}
