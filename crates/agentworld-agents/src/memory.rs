//! Bounded ring of recent, time-stamped memory strings.
//!
//! Every entry is rendered as `"[HH:MM:SS] <event>"` on the UTC wall clock.
//! When the ring is full the oldest entry is evicted first.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};

/// Recent memories of a single agent, oldest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryRing {
    entries: VecDeque<String>,
    capacity: usize,
}

impl MemoryRing {
    /// Create an empty ring holding at most `capacity` entries.
    ///
    /// A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append an event stamped with the current wall-clock time.
    pub fn remember(&mut self, event: &str) {
        self.remember_at(Utc::now(), event);
    }

    /// Append an event stamped with `at`, evicting the oldest if full.
    pub fn remember_at(&mut self, at: DateTime<Utc>, event: &str) {
        while self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries
            .push_back(format!("[{}] {event}", at.format("%H:%M:%S")));
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the ring holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of entries.
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Iterate entries oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    /// The `n` most recent entries, oldest first.
    pub fn recent(&self, n: usize) -> Vec<String> {
        let skip = self.entries.len().saturating_sub(n);
        self.entries.iter().skip(skip).cloned().collect()
    }

    /// Copy all entries into a vector, oldest first.
    pub fn to_vec(&self) -> Vec<String> {
        self.entries.iter().cloned().collect()
    }
}
