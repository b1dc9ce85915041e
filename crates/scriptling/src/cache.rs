//! Content-addressed program cache shared by all interpreter instances.
//!
//! Parsed programs are keyed by a dual 64-bit hash of the source text,
//! produced by two independently seeded hashers; a false hit requires a
//! simultaneous collision on both (≈2⁻¹²⁸). Entries are evicted LRU once the
//! cache is full. Cache contents are never persisted across processes.

use std::{
    collections::VecDeque,
    hash::BuildHasher,
    sync::{Arc, LazyLock, Mutex, RwLock},
};

use ahash::{AHashMap, RandomState};

use crate::ast::Program;

/// Upper bound on cached programs across the whole process.
const CACHE_CAPACITY: usize = 1000;

/// Dual-hash identity of a source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct SourceKey(u64, u64);

impl SourceKey {
    pub(crate) fn of(source: &str) -> Self {
        // Fixed, distinct seeds: keys must agree across interpreter
        // instances within the process, and the two hashes must be
        // independent of each other.
        static HASH_A: LazyLock<RandomState> =
            LazyLock::new(|| RandomState::with_seeds(0x243f_6a88_85a3_08d3, 0x1319_8a2e_0370_7344, 0xa409_3822_299f_31d0, 0x082e_fa98_ec4e_6c89));
        static HASH_B: LazyLock<RandomState> =
            LazyLock::new(|| RandomState::with_seeds(0x4528_21e6_38d0_1377, 0xbe54_66cf_34e9_0c6c, 0xc0ac_29b7_c97c_50dd, 0x3f84_d5b5_b547_0917));
        Self(HASH_A.hash_one(source), HASH_B.hash_one(source))
    }
}

/// Concurrency-safe LRU of parsed programs.
///
/// The map is behind an `RwLock` so concurrent lookups do not serialize;
/// recency order lives in a separate `Mutex`. Promotion on a hit is
/// best-effort: when the order lock is contended the promotion is skipped and
/// the read path returns immediately.
pub(crate) struct ProgramCache {
    map: RwLock<AHashMap<SourceKey, Arc<Program>>>,
    /// Keys from least to most recently used. Always the same cardinality as
    /// the map.
    order: Mutex<VecDeque<SourceKey>>,
    capacity: usize,
}

impl ProgramCache {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            map: RwLock::new(AHashMap::with_capacity(capacity)),
            order: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    /// The process-wide cache used by every interpreter.
    pub(crate) fn global() -> &'static Self {
        static GLOBAL: LazyLock<ProgramCache> = LazyLock::new(|| ProgramCache::with_capacity(CACHE_CAPACITY));
        &GLOBAL
    }

    pub(crate) fn get(&self, key: SourceKey) -> Option<Arc<Program>> {
        let program = {
            let map = self.map.read().ok()?;
            map.get(&key).cloned()?
        };
        // Best-effort promotion to most-recently-used.
        if let Ok(mut order) = self.order.try_lock() {
            if let Some(pos) = order.iter().position(|k| *k == key) {
                order.remove(pos);
                order.push_back(key);
            }
        }
        Some(program)
    }

    pub(crate) fn insert(&self, key: SourceKey, program: Arc<Program>) {
        let (Ok(mut map), Ok(mut order)) = (self.map.write(), self.order.lock()) else {
            return;
        };
        if map.insert(key, program).is_some() {
            // Already cached: refresh recency only.
            if let Some(pos) = order.iter().position(|k| *k == key) {
                order.remove(pos);
            }
            order.push_back(key);
            return;
        }
        order.push_back(key);
        while map.len() > self.capacity {
            let Some(evicted) = order.pop_front() else {
                break;
            };
            map.remove(&evicted);
        }
    }

    #[cfg(test)]
    fn contains(&self, source: &str) -> bool {
        let key = SourceKey::of(source);
        self.map.read().is_ok_and(|map| map.contains_key(&key))
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.map.read().map_or(0, |map| map.len())
    }

    #[cfg(test)]
    fn order_len(&self) -> usize {
        self.order.lock().map_or(0, |order| order.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn program() -> Arc<Program> {
        Arc::new(Program { statements: vec![] })
    }

    #[test]
    fn distinct_sources_have_distinct_keys() {
        assert_ne!(SourceKey::of("x = 1"), SourceKey::of("x = 2"));
        assert_ne!(SourceKey::of(""), SourceKey::of(" "));
    }

    #[test]
    fn keys_are_stable_within_process() {
        assert_eq!(SourceKey::of("y = 3"), SourceKey::of("y = 3"));
    }

    #[test]
    fn lru_eviction_after_promotion() {
        // With capacity 3: insert a, b, c; read a; insert d -> b evicted.
        let cache = ProgramCache::with_capacity(3);
        cache.insert(SourceKey::of("a"), program());
        cache.insert(SourceKey::of("b"), program());
        cache.insert(SourceKey::of("c"), program());
        assert!(cache.get(SourceKey::of("a")).is_some());
        cache.insert(SourceKey::of("d"), program());

        assert!(!cache.contains("b"));
        assert!(cache.contains("a"));
        assert!(cache.contains("c"));
        assert!(cache.contains("d"));
    }

    #[test]
    fn map_and_order_stay_in_sync() {
        let cache = ProgramCache::with_capacity(4);
        for source in ["a", "b", "c", "d", "e", "f", "a", "b"] {
            cache.insert(SourceKey::of(source), program());
            assert_eq!(cache.len(), cache.order_len());
            assert!(cache.len() <= 4);
        }
    }

    #[test]
    fn reinserting_refreshes_recency() {
        let cache = ProgramCache::with_capacity(2);
        cache.insert(SourceKey::of("a"), program());
        cache.insert(SourceKey::of("b"), program());
        cache.insert(SourceKey::of("a"), program());
        cache.insert(SourceKey::of("c"), program());
        assert!(!cache.contains("b"));
        assert!(cache.contains("a"));
        assert!(cache.contains("c"));
    }

    #[test]
    fn miss_returns_none() {
        let cache = ProgramCache::with_capacity(2);
        assert!(cache.get(SourceKey::of("nope")).is_none());
    }
}
