//! Cache Module
//!
//! Provides the in-memory TTL cache that remembers which media URLs have
//! already loaded successfully.

mod clock;
mod entry;
mod media;
mod stats;
mod store;


use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;

// Re-export public types
pub use clock::{current_timestamp_ms, Clock, ManualClock, SystemClock};
pub use entry::CacheEntry;
pub use media::CachedMedia;
pub use stats::CacheStats;
pub use store::TtlCache;

// == Public Constants ==
/// Default lifetime of a cached load result
pub const DEFAULT_TTL: Duration = Duration::from_secs(120);

/// Cache of settled media loads keyed by canonical URL.
pub type MediaCache = TtlCache<CachedMedia>;

/// Process-wide handle; every operation is serialized behind the lock.
pub type SharedCache = Arc<RwLock<MediaCache>>;

/// Wraps a media cache for sharing between loaders, preloaders and tasks.
pub fn shared(cache: MediaCache) -> SharedCache {
    Arc::new(RwLock::new(cache))
}
