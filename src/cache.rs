//! In-memory audio cache for prefetched units
//!
//! Purely passive bookkeeping: the engine decides what to fetch and when,
//! the cache only records audio, in-flight fetches, and failure counts.
//! Entries are never evicted individually; the whole cache is cleared on
//! stop or chapter change.

use std::collections::{HashMap, HashSet};

/// Audio cache keyed by unit index
#[derive(Debug, Default)]
pub struct PrefetchCache {
    entries: HashMap<usize, Vec<u8>>,
    fetching: HashSet<usize>,
    attempts: HashMap<usize, u32>,
}

impl PrefetchCache {
    /// Create an empty cache
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached audio for a unit, if present.
    ///
    /// The entry stays cached so a backwards skip can replay it without
    /// another fetch.
    #[must_use]
    pub fn audio(&self, index: usize) -> Option<Vec<u8>> {
        self.entries.get(&index).cloned()
    }

    /// Whether a unit's audio is cached
    #[must_use]
    pub fn is_cached(&self, index: usize) -> bool {
        self.entries.contains_key(&index)
    }

    /// Whether a fetch for this unit is currently in flight
    #[must_use]
    pub fn is_fetching(&self, index: usize) -> bool {
        self.fetching.contains(&index)
    }

    /// Record fetched audio for a unit.
    ///
    /// Clears the in-flight mark and any failure count, so a unit is never
    /// simultaneously cached and fetching.
    pub fn put(&mut self, index: usize, audio: Vec<u8>) {
        self.fetching.remove(&index);
        self.attempts.remove(&index);
        self.entries.insert(index, audio);
    }

    /// Mark a fetch as in flight.
    ///
    /// Returns `false` when the unit is already cached or already being
    /// fetched, in which case the caller must not start another fetch.
    pub fn mark_fetching(&mut self, index: usize) -> bool {
        if self.entries.contains_key(&index) || self.fetching.contains(&index) {
            return false;
        }
        self.fetching.insert(index);
        true
    }

    /// Drop the in-flight mark without recording audio
    pub fn unmark_fetching(&mut self, index: usize) {
        self.fetching.remove(&index);
    }

    /// Record a failed fetch attempt, returning the total failures so far
    pub fn record_failure(&mut self, index: usize) -> u32 {
        let count = self.attempts.entry(index).or_insert(0);
        *count += 1;
        *count
    }

    /// Failure count for a unit
    #[must_use]
    pub fn failures(&self, index: usize) -> u32 {
        self.attempts.get(&index).copied().unwrap_or(0)
    }

    /// Indices with cached audio, in ascending order
    #[must_use]
    pub fn cached_indices(&self) -> Vec<usize> {
        let mut indices: Vec<usize> = self.entries.keys().copied().collect();
        indices.sort_unstable();
        indices
    }

    /// Number of cached entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds no audio
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop all entries, in-flight marks, and failure counts
    pub fn clear(&mut self) {
        self.entries.clear();
        self.fetching.clear();
        self.attempts.clear();
    }
}
