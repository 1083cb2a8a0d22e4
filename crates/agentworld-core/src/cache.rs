//! Soft-bounded generation caches.
//!
//! Both dispatchers keep one [`GenerationCache`] each, keyed by a request
//! fingerprint. The bound is soft: an insert that pushes the cache past its
//! capacity evicts randomly sampled entries until it fits again. No
//! ordering is kept, so eviction never needs more than the key list.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use rand::seq::IteratorRandom;
use tracing::debug;

/// A fingerprint-keyed text cache shared across dispatcher tasks.
#[derive(Debug)]
pub struct GenerationCache {
    name: &'static str,
    capacity: usize,
    entries: Mutex<HashMap<u64, String>>,
}

impl GenerationCache {
    /// Empty cache holding roughly `capacity` entries (at least one).
    pub fn new(name: &'static str, capacity: usize) -> Self {
        Self {
            name,
            capacity: capacity.max(1),
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Cached text for `fingerprint`, if any.
    pub fn get(&self, fingerprint: u64) -> Option<String> {
        self.lock().get(&fingerprint).cloned()
    }

    /// Store `text` under `fingerprint`, evicting sampled entries when the
    /// cache grows past its capacity.
    pub fn insert(&self, fingerprint: u64, text: String) {
        let mut entries = self.lock();
        entries.insert(fingerprint, text);
        let excess = entries.len().saturating_sub(self.capacity);
        if excess == 0 {
            return;
        }
        let victims: Vec<u64> = entries
            .keys()
            .copied()
            .filter(|k| *k != fingerprint)
            .choose_multiple(&mut rand::rng(), excess);
        for key in &victims {
            entries.remove(key);
        }
        debug!(cache = self.name, evicted = victims.len(), "cache evicted entries");
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Configured ceiling.
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.lock().clear();
    }

    // A panicking holder cannot leave the map half-written, so a poisoned
    // lock is still safe to use.
    fn lock(&self) -> MutexGuard<'_, HashMap<u64, String>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
