//! Bounded, time-aware render cache for fig.
//!
//! [`RenderCache`] makes repeated renders of unchanged content free while
//! enforcing strict size and staleness bounds:
//!
//! - keyed by exact content equality over [`CacheKey`] (source, type,
//!   format, optional document scope)
//! - capacity bound: inserting past `max_entries` synchronously evicts
//!   the oldest 20% of entries by creation time (FIFO, not LRU)
//! - age bound: entries older than `max_age` are treated as misses on
//!   read and removed lazily; [`RenderCache::prune_expired`] sweeps
//!   proactively
//!
//! The cache never raises errors — misses and expirations are ordinary
//! `None` returns. Access is serialized internally so the eviction
//! invariant holds under threaded callers.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use fig_cache::{CacheKey, RenderCache};
//!
//! let cache = RenderCache::new(100, Duration::from_secs(3600));
//! let key = CacheKey::new("A->B", "plantuml", "svg");
//! cache.set(key.clone(), "<svg/>".to_owned());
//! assert_eq!(cache.get(&key), Some("<svg/>".to_owned()));
//! ```

mod key;

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

pub use key::CacheKey;

/// Cache occupancy snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    /// Current entry count.
    pub size: usize,
    /// Configured maximum entry count.
    pub max_size: usize,
}

/// A cached render. Owned exclusively by the cache; `get` hands out
/// copies of the content, never references.
#[derive(Debug)]
struct Entry {
    content: String,
    created: Instant,
    /// Insertion sequence, breaks creation-time ties deterministically.
    seq: u64,
}

#[derive(Debug)]
struct Inner {
    entries: HashMap<CacheKey, Entry>,
    max_entries: usize,
    max_age: Duration,
    next_seq: u64,
}

impl Inner {
    /// Remove the `count` oldest entries by (creation time, sequence).
    fn evict_oldest(&mut self, count: usize) {
        if count == 0 {
            return;
        }
        let mut order: Vec<(Instant, u64, CacheKey)> = self
            .entries
            .iter()
            .map(|(k, e)| (e.created, e.seq, k.clone()))
            .collect();
        order.sort_unstable_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));
        for (_, _, key) in order.into_iter().take(count) {
            self.entries.remove(&key);
        }
    }

    /// Eviction batch size: 20% of the capacity, at least one entry.
    fn eviction_batch(&self) -> usize {
        (self.max_entries / 5).max(1)
    }

    fn is_expired(&self, entry: &Entry, now: Instant) -> bool {
        now.duration_since(entry.created) > self.max_age
    }
}

/// In-memory render cache with FIFO-by-age eviction and lazy expiry.
#[derive(Debug)]
pub struct RenderCache {
    inner: Mutex<Inner>,
}

impl RenderCache {
    /// Create a cache bounded to `max_entries` entries and `max_age` per
    /// entry. Both bounds can be changed later via
    /// [`set_limits`](Self::set_limits).
    #[must_use]
    pub fn new(max_entries: usize, max_age: Duration) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                max_entries: max_entries.max(1),
                max_age,
                next_seq: 0,
            }),
        }
    }

    /// Retrieve a copy of the cached content for `key`.
    ///
    /// An entry past its age bound is a miss; it is removed as a side
    /// effect of the read.
    #[must_use]
    pub fn get(&self, key: &CacheKey) -> Option<String> {
        self.get_at(key, Instant::now())
    }

    /// Store rendered content under `key`, evicting the oldest entries
    /// if the insert pushes the cache past its capacity.
    pub fn set(&self, key: CacheKey, content: String) {
        self.set_at(key, content, Instant::now());
    }

    /// Remove all entries. Safe to call when empty.
    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.entries.clear();
    }

    /// Current occupancy and capacity.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        let inner = self.lock();
        CacheStats {
            size: inner.entries.len(),
            max_size: inner.max_entries,
        }
    }

    /// Proactively remove every expired entry, returning the number
    /// removed.
    pub fn prune_expired(&self) -> usize {
        self.prune_expired_at(Instant::now())
    }

    /// Update the capacity and age bounds.
    ///
    /// Shrinking the capacity evicts the oldest entries immediately so
    /// the size bound holds without waiting for the next `set`.
    pub fn set_limits(&self, max_entries: usize, max_age: Duration) {
        let mut inner = self.lock();
        inner.max_entries = max_entries.max(1);
        inner.max_age = max_age;
        let len = inner.entries.len();
        if len > inner.max_entries {
            let excess = len - inner.max_entries;
            tracing::debug!("cache capacity lowered, evicting {excess} oldest entries");
            inner.evict_oldest(excess);
        }
    }

    fn get_at(&self, key: &CacheKey, now: Instant) -> Option<String> {
        let mut inner = self.lock();
        let expired = inner.entries.get(key).is_some_and(|e| inner.is_expired(e, now));
        if expired {
            tracing::debug!(
                fingerprint = %key.fingerprint(),
                "cache entry past age bound, dropping"
            );
            inner.entries.remove(key);
            return None;
        }
        inner.entries.get(key).map(|e| e.content.clone())
    }

    fn set_at(&self, key: CacheKey, content: String, now: Instant) {
        let mut inner = self.lock();
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.entries.insert(
            key,
            Entry {
                content,
                created: now,
                seq,
            },
        );
        if inner.entries.len() > inner.max_entries {
            let batch = inner.eviction_batch();
            tracing::debug!("cache over capacity, evicting {batch} oldest entries");
            inner.evict_oldest(batch);
        }
    }

    fn prune_expired_at(&self, now: Instant) -> usize {
        let mut inner = self.lock();
        let before = inner.entries.len();
        let max_age = inner.max_age;
        inner
            .entries
            .retain(|_, e| now.duration_since(e.created) <= max_age);
        before - inner.entries.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    const HOUR: Duration = Duration::from_secs(3600);

    fn key(n: usize) -> CacheKey {
        CacheKey::new(&format!("source-{n}"), "plantuml", "svg")
    }

    #[test]
    fn test_set_then_get() {
        let cache = RenderCache::new(10, HOUR);
        cache.set(key(1), "content".to_owned());
        assert_eq!(cache.get(&key(1)), Some("content".to_owned()));
    }

    #[test]
    fn test_miss_on_unknown_key() {
        let cache = RenderCache::new(10, HOUR);
        assert_eq!(cache.get(&key(1)), None);
    }

    #[test]
    fn test_exact_key_equality() {
        let cache = RenderCache::new(10, HOUR);
        cache.set(CacheKey::new("A->B", "plantuml", "svg"), "x".to_owned());
        // Any field difference is a different key
        assert_eq!(cache.get(&CacheKey::new("A->B", "plantuml", "png")), None);
        assert_eq!(cache.get(&CacheKey::new("A->B", "mermaid", "svg")), None);
        assert_eq!(cache.get(&CacheKey::new("A-> B", "plantuml", "svg")), None);
        assert_eq!(
            cache.get(&CacheKey::new("A->B", "plantuml", "svg").scoped("doc")),
            None
        );
    }

    #[test]
    fn test_overwrite_same_key() {
        let cache = RenderCache::new(10, HOUR);
        cache.set(key(1), "first".to_owned());
        cache.set(key(1), "second".to_owned());
        assert_eq!(cache.get(&key(1)), Some("second".to_owned()));
        assert_eq!(cache.stats().size, 1);
    }

    #[test]
    fn test_capacity_invariant_after_every_set() {
        let cache = RenderCache::new(5, HOUR);
        for n in 0..50 {
            cache.set(key(n), "c".to_owned());
            assert!(cache.stats().size <= 5, "size exceeded bound after set {n}");
        }
    }

    #[test]
    fn test_fifo_eviction_drops_first_inserted() {
        let cache = RenderCache::new(5, HOUR);
        let base = Instant::now();
        for n in 0..6 {
            cache.set_at(key(n), format!("c{n}"), base + Duration::from_secs(n as u64));
        }

        // 6th insert overflows; the oldest ~20% (one entry) is evicted
        assert_eq!(cache.get(&key(0)), None);
        for n in 1..6 {
            assert!(cache.get(&key(n)).is_some(), "entry {n} should survive");
        }
        assert_eq!(cache.stats().size, 5);
    }

    #[test]
    fn test_fifo_eviction_ignores_access_recency() {
        let cache = RenderCache::new(5, HOUR);
        let base = Instant::now();
        for n in 0..5 {
            cache.set_at(key(n), "c".to_owned(), base + Duration::from_secs(n as u64));
        }
        // Touch the oldest entry; FIFO eviction must still drop it
        assert!(cache.get_at(&key(0), base + Duration::from_secs(10)).is_some());

        cache.set_at(key(5), "c".to_owned(), base + Duration::from_secs(11));
        assert_eq!(cache.get(&key(0)), None);
    }

    #[test]
    fn test_eviction_batch_is_twenty_percent() {
        let cache = RenderCache::new(10, HOUR);
        let base = Instant::now();
        for n in 0..11 {
            cache.set_at(key(n), "c".to_owned(), base + Duration::from_secs(n as u64));
        }
        // 11th insert evicts 10/5 = 2 oldest entries
        assert_eq!(cache.stats().size, 9);
        assert_eq!(cache.get(&key(0)), None);
        assert_eq!(cache.get(&key(1)), None);
        assert!(cache.get(&key(2)).is_some());
    }

    #[test]
    fn test_fifo_ties_broken_by_insertion_order() {
        let cache = RenderCache::new(5, HOUR);
        let now = Instant::now();
        // All entries share one creation instant
        for n in 0..6 {
            cache.set_at(key(n), "c".to_owned(), now);
        }
        assert_eq!(cache.get(&key(0)), None);
        assert!(cache.get(&key(1)).is_some());
    }

    #[test]
    fn test_age_expiry_on_get_removes_entry() {
        let cache = RenderCache::new(10, HOUR);
        let base = Instant::now();
        cache.set_at(key(1), "c".to_owned(), base);

        // Within the bound: hit
        let at_bound = base + HOUR;
        assert!(cache.get_at(&key(1), at_bound).is_some());

        // Past the bound: miss, and the entry is gone
        let past = base + HOUR + Duration::from_secs(1);
        assert_eq!(cache.get_at(&key(1), past), None);
        assert_eq!(cache.stats().size, 0);
    }

    #[test]
    fn test_prune_expired() {
        let cache = RenderCache::new(10, HOUR);
        let base = Instant::now();
        cache.set_at(key(1), "old".to_owned(), base);
        cache.set_at(key(2), "new".to_owned(), base + HOUR);

        let removed = cache.prune_expired_at(base + HOUR + Duration::from_secs(1));
        assert_eq!(removed, 1);
        assert_eq!(cache.stats().size, 1);
        assert!(cache.get_at(&key(2), base + HOUR).is_some());
    }

    #[test]
    fn test_prune_expired_noop_when_fresh() {
        let cache = RenderCache::new(10, HOUR);
        cache.set(key(1), "c".to_owned());
        assert_eq!(cache.prune_expired(), 0);
        assert_eq!(cache.stats().size, 1);
    }

    #[test]
    fn test_clear() {
        let cache = RenderCache::new(10, HOUR);
        cache.clear(); // safe on empty
        for n in 0..3 {
            cache.set(key(n), "c".to_owned());
        }
        cache.clear();
        assert_eq!(cache.stats().size, 0);
        assert_eq!(cache.get(&key(0)), None);
    }

    #[test]
    fn test_stats() {
        let cache = RenderCache::new(7, HOUR);
        assert_eq!(cache.stats(), CacheStats { size: 0, max_size: 7 });
        cache.set(key(1), "c".to_owned());
        assert_eq!(cache.stats(), CacheStats { size: 1, max_size: 7 });
    }

    #[test]
    fn test_set_limits_shrink_evicts_oldest() {
        let cache = RenderCache::new(10, HOUR);
        let base = Instant::now();
        for n in 0..8 {
            cache.set_at(key(n), "c".to_owned(), base + Duration::from_secs(n as u64));
        }

        cache.set_limits(4, HOUR);
        assert_eq!(cache.stats(), CacheStats { size: 4, max_size: 4 });
        // The four oldest are gone, the four newest remain
        assert_eq!(cache.get(&key(3)), None);
        assert!(cache.get(&key(4)).is_some());
    }

    #[test]
    fn test_set_limits_age_applies_to_existing_entries() {
        let cache = RenderCache::new(10, HOUR);
        let base = Instant::now();
        cache.set_at(key(1), "c".to_owned(), base);

        cache.set_limits(10, Duration::from_secs(1));
        assert_eq!(cache.get_at(&key(1), base + Duration::from_secs(2)), None);
    }

    #[test]
    fn test_zero_capacity_clamped_to_one() {
        let cache = RenderCache::new(0, HOUR);
        cache.set(key(1), "c".to_owned());
        assert_eq!(cache.stats().max_size, 1);
        assert!(cache.stats().size <= 1);
    }
}
