//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support.

// == Cache Entry ==
/// Represents a single cache entry with value and expiry metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry<V> {
    /// The stored value
    pub value: V,
    /// Insertion or last touch timestamp (Unix milliseconds)
    pub cached_at: u64,
    /// Expiration timestamp (Unix milliseconds)
    pub expires_at: u64,
    /// Identifies the expiry record scheduled for this insertion
    pub(crate) generation: u64,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    /// Creates an entry cached at `now_ms` that lives for `ttl_ms`.
    pub fn new(value: V, now_ms: u64, ttl_ms: u64, generation: u64) -> Self {
        Self {
            value,
            cached_at: now_ms,
            expires_at: now_ms.saturating_add(ttl_ms),
            generation,
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired at `now_ms`.
    ///
    /// An entry is live only while `now - cached_at < ttl`, so it is expired
    /// from the exact moment the TTL has fully elapsed.
    pub fn is_expired_at(&self, now_ms: u64) -> bool {
        now_ms >= self.expires_at
    }

    /// Remaining lifetime in milliseconds, zero once expired.
    pub fn ttl_remaining_ms(&self, now_ms: u64) -> u64 {
        self.expires_at.saturating_sub(now_ms)
    }
}
