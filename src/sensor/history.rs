//! Fixed-capacity usage history.

use std::collections::VecDeque;

/// Number of samples kept per sensor.
pub const HISTORY_SIZE: usize = 10;

/// Fixed-capacity ring of samples, oldest first.
///
/// Empty until the first push, which zero-fills it to capacity; from then on
/// every push evicts the oldest value, so the length is always 0 or `cap`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageHistory {
    data: VecDeque<u64>,
    cap: usize,
}

impl Default for UsageHistory {
    fn default() -> Self {
        Self::new(HISTORY_SIZE)
    }
}

impl UsageHistory {
    /// `cap` must be non-zero.
    #[must_use]
    pub fn new(cap: usize) -> Self {
        assert!(cap > 0, "history capacity must be non-zero");
        Self {
            data: VecDeque::with_capacity(cap),
            cap,
        }
    }

    pub fn push(&mut self, val: u64) {
        if self.data.is_empty() {
            self.data.resize(self.cap, 0);
        }
        self.data.pop_front();
        self.data.push_back(val);
    }

    /// Most recent sample.
    #[must_use]
    pub fn latest(&self) -> Option<u64> {
        self.data.back().copied()
    }

    /// Samples oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = u64> + '_ {
        self.data.iter().copied()
    }

    /// Comma-joined samples, oldest to newest.
    #[must_use]
    pub fn joined(&self) -> String {
        self.iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(",")
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.cap
    }
}
