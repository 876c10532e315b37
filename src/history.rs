/// Bounded in-memory history of canonical readings
use std::collections::VecDeque;
use time::OffsetDateTime;

use crate::models::{Metric, Reading};

/// 24 hours at one reading per minute.
pub const DEFAULT_CAPACITY: usize = 1440;

/// Chronological ring buffer of readings.
///
/// One record is stored per reading, so per-metric series and the timestamp
/// series derived from it always have the same length and share indices.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    capacity: usize,
    entries: VecDeque<Reading>,
}

impl Default for HistoryStore {
    fn default() -> Self {
        HistoryStore::new(DEFAULT_CAPACITY)
    }
}

impl HistoryStore {
    /// Create an empty store. A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        HistoryStore {
            capacity,
            entries: VecDeque::with_capacity(capacity),
        }
    }

    /// Append at the tail, evicting from the head once over capacity.
    pub fn append(&mut self, reading: Reading) {
        self.entries.push_back(reading);
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn latest(&self) -> Option<&Reading> {
        self.entries.back()
    }

    /// The reading appended just before the latest one.
    pub fn previous(&self) -> Option<&Reading> {
        self.entries.len().checked_sub(2).and_then(|i| self.entries.get(i))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Reading> {
        self.entries.iter()
    }

    /// Independent copy of the current contents, oldest first.
    pub fn snapshot(&self) -> Vec<Reading> {
        self.entries.iter().cloned().collect()
    }

    /// Replay over a private snapshot; later appends do not affect it.
    pub fn replay(&self) -> std::vec::IntoIter<Reading> {
        self.snapshot().into_iter()
    }

    pub fn timestamps(&self) -> Vec<OffsetDateTime> {
        self.entries.iter().map(|r| r.timestamp).collect()
    }

    /// Index-aligned series for one metric, `None` where the reading lacked it.
    pub fn series(&self, metric: Metric) -> Vec<Option<f64>> {
        self.entries.iter().map(|r| r.get(metric)).collect()
    }

    /// Up to `n` most recent present values of `metric`, oldest first.
    pub fn recent_values(&self, metric: Metric, n: usize) -> Vec<f64> {
        let mut values: Vec<f64> = self
            .entries
            .iter()
            .rev()
            .filter_map(|r| r.get(metric))
            .take(n)
            .collect();
        values.reverse();
        values
    }
}
