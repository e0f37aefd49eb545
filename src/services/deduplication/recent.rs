//! Recency cache of fingerprints.
//!
//! A bounded, insertion-ordered key set with FIFO eviction, one instance per
//! surface.

use super::types::Fingerprint;
use crate::models::Surface;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Bounded set of recently seen fingerprints.
///
/// # How it works
///
/// Entries live in an [`LruCache`] that is only ever looked up with
/// `contains`, which does not touch recency. Its "least recently used" end
/// is therefore exactly the oldest insertion, and eviction is FIFO by
/// arrival, not by access.
///
/// # Thread Safety
///
/// A single `Mutex` guards each instance. [`check_and_insert`] performs the
/// membership test and the insert under one acquisition, so two concurrent
/// arrivals with the same key can never both see "not present". The guard is
/// never held across I/O.
///
/// # Lock Poisoning
///
/// A poisoned lock is recovered rather than propagated: every operation
/// leaves the set in a valid state, so a panic elsewhere cannot corrupt it.
///
/// [`check_and_insert`]: Self::check_and_insert
///
/// # Example
///
/// ```rust
/// use repostwatch::models::Surface;
/// use repostwatch::services::deduplication::{Fingerprint, RecencyCache};
/// use std::num::NonZeroUsize;
///
/// let cache = RecencyCache::new(Surface::Chat, NonZeroUsize::new(2).unwrap());
/// for key in ["a", "b", "c"] {
///     cache.insert(Fingerprint::new(key));
/// }
/// assert!(!cache.contains(&Fingerprint::new("a")));
/// assert_eq!(cache.keys(), vec![Fingerprint::new("b"), Fingerprint::new("c")]);
/// ```
pub struct RecencyCache {
    /// Which surface this cache serves (metrics label).
    surface: Surface,
    /// Keys in insertion order; values are presence markers.
    entries: Mutex<LruCache<Fingerprint, ()>>,
    /// Fixed capacity.
    capacity: NonZeroUsize,
}

impl RecencyCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new(surface: Surface, capacity: NonZeroUsize) -> Self {
        Self {
            surface,
            entries: Mutex::new(LruCache::new(capacity)),
            capacity,
        }
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<Fingerprint, ()>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns true if `key` is present.
    pub fn contains(&self, key: &Fingerprint) -> bool {
        self.lock().contains(key)
    }

    /// Inserts `key` at the newest position.
    ///
    /// No-op if the key is already present (its position is not refreshed).
    /// Evicts the oldest entry if the cache is full.
    pub fn insert(&self, key: Fingerprint) {
        let mut entries = self.lock();
        self.insert_locked(&mut entries, key);
    }

    /// Removes oldest entries until there is room for at least one more.
    ///
    /// Returns the number of entries evicted.
    pub fn evict_to_capacity(&self) -> usize {
        let mut entries = self.lock();
        let mut evicted = 0;
        while entries.len() >= self.capacity.get() {
            if entries.pop_lru().is_none() {
                break;
            }
            evicted += 1;
        }
        if evicted > 0 {
            tracing::debug!(surface = %self.surface, evicted, "Evicted oldest fingerprints");
        }
        evicted
    }

    /// Atomically tests `candidate` and, if absent, inserts every key in `keys`.
    ///
    /// Returns true if `candidate` was already present, in which case nothing is
    /// inserted.
    pub fn check_and_insert(&self, candidate: &Fingerprint, keys: &[Fingerprint]) -> bool {
        let mut entries = self.lock();
        if entries.contains(candidate) {
            return true;
        }
        for key in keys {
            self.insert_locked(&mut entries, key.clone());
        }
        false
    }

    #[allow(clippy::cast_precision_loss)]
    fn insert_locked(&self, entries: &mut LruCache<Fingerprint, ()>, key: Fingerprint) {
        if entries.contains(&key) {
            return;
        }
        if let Some((evicted, ())) = entries.push(key, ()) {
            tracing::trace!(surface = %self.surface, key = %evicted, "Evicted oldest fingerprint");
        }
        metrics::gauge!("repostwatch_cache_size", "surface" => self.surface.as_str())
            .set(entries.len() as f64);
    }

    /// Returns the number of stored fingerprints.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns true if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the fixed capacity.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity.get()
    }

    /// Returns the surface this cache serves.
    #[must_use]
    pub const fn surface(&self) -> Surface {
        self.surface
    }

    /// Returns a snapshot of the keys, oldest first.
    pub fn keys(&self) -> Vec<Fingerprint> {
        self.lock().iter().rev().map(|(key, ())| key.clone()).collect()
    }
}

impl std::fmt::Debug for RecencyCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecencyCache")
            .field("surface", &self.surface)
            .field("capacity", &self.capacity)
            .field("len", &self.len())
            .finish()
    }
}
