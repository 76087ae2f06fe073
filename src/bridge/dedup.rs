//! Message deduplication.
//!
//! Suppresses re-relay of messages already processed, which is what
//! breaks the relay loop: a delivered message reappears as a native
//! event on the opposite platform, and without suppression it would be
//! relayed back and forth indefinitely.

use std::num::NonZeroUsize;
use std::sync::Mutex;

use lru::LruCache;

/// Bounded recent-hash set with oldest-first eviction.
///
/// Lookups do not refresh recency, so eviction order is insertion
/// order. Capacity bounds memory at the cost of false negatives for
/// very old duplicates, which is acceptable: the echoes this guard
/// exists to catch arrive within seconds of delivery.
pub struct DedupGuard {
    recent: Mutex<LruCache<String, ()>>,
}

impl DedupGuard {
    /// Create a guard remembering at most `capacity` hashes.
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            recent: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Whether this hash has been recorded within the retention window.
    pub fn is_duplicate(&self, content_hash: &str) -> bool {
        let recent = self.recent.lock().unwrap();
        recent.contains(content_hash)
    }

    /// Record a hash, evicting the oldest entry once over capacity.
    pub fn record(&self, content_hash: String) {
        let mut recent = self.recent.lock().unwrap();
        recent.put(content_hash, ());
    }

    /// Number of hashes currently retained.
    pub fn len(&self) -> usize {
        self.recent.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_unknown_hash_is_not_duplicate() {
        let guard = DedupGuard::new(16);
        assert!(!guard.is_duplicate("abc"));
        assert!(guard.is_empty());
    }

    #[test]
    fn test_recorded_hash_is_duplicate() {
        let guard = DedupGuard::new(16);
        guard.record("abc".to_string());
        assert!(guard.is_duplicate("abc"));
        assert!(!guard.is_duplicate("def"));
    }

    #[test]
    fn test_eviction_is_oldest_first() {
        let guard = DedupGuard::new(2);
        guard.record("one".to_string());
        guard.record("two".to_string());
        guard.record("three".to_string());

        assert_eq!(guard.len(), 2);
        assert!(!guard.is_duplicate("one"));
        assert!(guard.is_duplicate("two"));
        assert!(guard.is_duplicate("three"));
    }

    #[test]
    fn test_lookup_does_not_refresh_recency() {
        let guard = DedupGuard::new(2);
        guard.record("one".to_string());
        guard.record("two".to_string());

        // A hit on "one" must not save it from eviction.
        assert!(guard.is_duplicate("one"));
        guard.record("three".to_string());
        assert!(!guard.is_duplicate("one"));
    }

    #[test]
    fn test_zero_capacity_clamps_to_one() {
        let guard = DedupGuard::new(0);
        guard.record("only".to_string());
        assert!(guard.is_duplicate("only"));
    }

    #[test]
    fn test_concurrent_access() {
        let guard = Arc::new(DedupGuard::new(1024));
        let mut handles = Vec::new();
        for t in 0..4 {
            let guard = Arc::clone(&guard);
            handles.push(std::thread::spawn(move || {
                for i in 0..100 {
                    guard.record(format!("{}-{}", t, i));
                    assert!(guard.is_duplicate(&format!("{}-{}", t, i)));
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(guard.len(), 400);
    }
}
