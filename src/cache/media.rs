//! Cached media values.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::cache::current_timestamp_ms;

/// Settled outcome of a media load.
///
/// In-flight loads live in `LoadState`, not in the cache, so there is no
/// pending variant here.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum CachedMedia {
    /// The URL was fetched successfully
    Loaded { url: String, loaded_at: DateTime<Utc> },
    /// Every attempt, including retries, failed
    Failed { url: String, failed_at: DateTime<Utc> },
}

impl CachedMedia {
    /// Loaded now, on the system clock.
    pub fn loaded(url: impl Into<String>) -> Self {
        Self::loaded_at_ms(url, current_timestamp_ms())
    }

    /// Failed now, on the system clock.
    pub fn failed(url: impl Into<String>) -> Self {
        Self::failed_at_ms(url, current_timestamp_ms())
    }

    /// Loaded at `ms`; pass `TtlCache::now_ms` so the stamp agrees with
    /// the entry's `cached_at`.
    pub fn loaded_at_ms(url: impl Into<String>, ms: u64) -> Self {
        CachedMedia::Loaded {
            url: url.into(),
            loaded_at: from_millis(ms),
        }
    }

    pub fn failed_at_ms(url: impl Into<String>, ms: u64) -> Self {
        CachedMedia::Failed {
            url: url.into(),
            failed_at: from_millis(ms),
        }
    }

    /// Only successful loads let a consumer skip fetching.
    pub fn is_loaded(&self) -> bool {
        matches!(self, CachedMedia::Loaded { .. })
    }

    pub fn url(&self) -> &str {
        match self {
            CachedMedia::Loaded { url, .. } | CachedMedia::Failed { url, .. } => url,
        }
    }
}

fn from_millis(ms: u64) -> DateTime<Utc> {
    i64::try_from(ms)
        .ok()
        .and_then(DateTime::from_timestamp_millis)
        .unwrap_or_default()
}
