//! Cache Store Module
//!
//! TTL cache combining HashMap storage with a min-heap of expirations.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::cache::{CacheEntry, CacheStats, Clock, SystemClock};

/// Heap records are rebuilt once stale ones outnumber live entries by this much.
const HEAP_SLACK: usize = 64;

// == TTL Cache ==
/// Key -> value store where every entry expires a fixed TTL after it was
/// set or last touched.
///
/// Expiry is enforced twice: `purge_expired` drains due records from the
/// expiration heap (driven by the background sweep), and every read checks
/// the entry's own deadline and evicts it on the spot if stale. A live entry
/// is therefore never observable past its TTL.
#[derive(Debug)]
pub struct TtlCache<V> {
    /// Key-value storage
    entries: HashMap<String, CacheEntry<V>>,
    /// Scheduled expirations: (expires_at, generation, key)
    expirations: BinaryHeap<Reverse<(u64, u64, String)>>,
    /// Bumped on every insertion so superseded heap records can be skipped
    next_generation: u64,
    /// Performance statistics
    stats: CacheStats,
    /// Lifetime of an entry in milliseconds
    ttl_ms: u64,
    clock: Arc<dyn Clock>,
}

impl<V: Clone> TtlCache<V> {
    // == Constructor ==
    /// Creates a cache on the system clock.
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, Arc::new(SystemClock))
    }

    /// Creates a cache on an injected clock.
    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: HashMap::new(),
            expirations: BinaryHeap::new(),
            next_generation: 0,
            stats: CacheStats::new(),
            ttl_ms: ttl.as_millis() as u64,
            clock,
        }
    }

    // == Set ==
    /// Stores `value` under `key`, replacing any previous entry and
    /// restarting its TTL window.
    pub fn set(&mut self, key: impl Into<String>, value: V) {
        let key = key.into();
        let now = self.clock.now_ms();
        self.insert(key, value, now);
        self.stats.set_total_entries(self.entries.len());
    }

    fn insert(&mut self, key: String, value: V, now: u64) {
        self.next_generation += 1;
        let generation = self.next_generation;
        let entry = CacheEntry::new(value, now, self.ttl_ms, generation);

        // Any record for the previous entry is now stale and will be skipped
        self.expirations
            .push(Reverse((entry.expires_at, generation, key.clone())));
        self.entries.insert(key, entry);
        self.compact_if_needed();
    }

    // == Has ==
    /// Returns true only for a live entry. A stale entry is evicted.
    pub fn has(&mut self, key: &str) -> bool {
        self.live_entry(key).is_some()
    }

    // == Get ==
    /// Retrieves a live value, counting the lookup as a hit or miss.
    pub fn get(&mut self, key: &str) -> Option<V> {
        match self.live_entry(key).map(|entry| entry.value.clone()) {
            Some(value) => {
                self.stats.record_hit();
                Some(value)
            }
            None => {
                self.stats.record_miss();
                None
            }
        }
    }

    /// Inspects a live entry without evicting or counting anything.
    pub fn peek(&self, key: &str) -> Option<&CacheEntry<V>> {
        let now = self.clock.now_ms();
        self.entries
            .get(key)
            .filter(|entry| !entry.is_expired_at(now))
    }

    // == Touch ==
    /// Restarts the TTL window of a live entry. Returns false, doing
    /// nothing, when the key is absent or already expired.
    pub fn touch(&mut self, key: &str) -> bool {
        let value = match self.live_entry(key) {
            Some(entry) => entry.value.clone(),
            None => return false,
        };

        let now = self.clock.now_ms();
        self.insert(key.to_string(), value, now);
        true
    }

    // == Remove ==
    /// Removes an entry. Idempotent; returns whether anything was removed.
    pub fn remove(&mut self, key: &str) -> bool {
        let removed = self.entries.remove(key).is_some();
        self.stats.set_total_entries(self.entries.len());
        removed
    }

    // == Clear ==
    /// Drops every entry and every scheduled expiration.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.expirations.clear();
        self.stats.set_total_entries(0);
    }

    // == Purge Expired ==
    /// Removes every entry whose TTL has elapsed.
    ///
    /// Returns the number of entries removed.
    pub fn purge_expired(&mut self) -> usize {
        let now = self.clock.now_ms();
        let mut removed = 0;

        while let Some(Reverse((expires_at, _, _))) = self.expirations.peek() {
            if *expires_at > now {
                break;
            }
            let Some(Reverse((_, generation, key))) = self.expirations.pop() else {
                break;
            };

            let current = self
                .entries
                .get(&key)
                .is_some_and(|entry| entry.generation == generation);
            if current {
                self.entries.remove(&key);
                removed += 1;
            }
        }

        if removed > 0 {
            debug!("Purged {} expired cache entries", removed);
            self.stats.record_expirations(removed);
        }
        self.stats.set_total_entries(self.entries.len());
        removed
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_total_entries(self.entries.len());
        stats
    }

    /// Returns the current number of entries, including any not yet purged.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }

    /// Current time on the cache's clock, in milliseconds since the epoch.
    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    /// Looks up an entry, evicting it if its TTL has elapsed.
    fn live_entry(&mut self, key: &str) -> Option<&CacheEntry<V>> {
        let now = self.clock.now_ms();
        let stale = self.entries.get(key)?.is_expired_at(now);

        if stale {
            debug!("Evicting stale cache entry '{}' on read", key);
            self.entries.remove(key);
            self.stats.record_expirations(1);
            self.stats.set_total_entries(self.entries.len());
            return None;
        }

        self.entries.get(key)
    }

    /// Rebuilds the heap from live entries once superseded records pile up.
    fn compact_if_needed(&mut self) {
        if self.expirations.len() <= self.entries.len() * 2 + HEAP_SLACK {
            return;
        }

        self.expirations = self
            .entries
            .iter()
            .map(|(key, entry)| Reverse((entry.expires_at, entry.generation, key.clone())))
            .collect();
    }
}
