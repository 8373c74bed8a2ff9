//! Response DTOs for the operator API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;

use crate::cache::{CacheStats, CachedMedia};
use crate::loader::{LoadState, LoadStatus};
use crate::preload::PreloadProgress;

/// Response body for `GET /resolve`
#[derive(Debug, Clone, Serialize)]
pub struct ResolveResponse {
    pub reference: Option<String>,
    pub url: String,
}

/// Response body for `GET /cache/:key`
#[derive(Debug, Clone, Serialize)]
pub struct CacheEntryResponse {
    pub key: String,
    pub media: CachedMedia,
    pub ttl_remaining_ms: u64,
}

/// Response body for `GET /cache/stats`
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    pub hits: u64,
    pub misses: u64,
    pub expirations: u64,
    pub total_entries: usize,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
}

impl From<CacheStats> for StatsResponse {
    fn from(stats: CacheStats) -> Self {
        Self {
            hit_rate: stats.hit_rate(),
            hits: stats.hits,
            misses: stats.misses,
            expirations: stats.expirations,
            total_entries: stats.total_entries,
        }
    }
}

/// Response body for `POST /preload`
#[derive(Debug, Clone, Serialize)]
pub struct PreloadResponse {
    pub progress: u8,
    pub total: usize,
    pub attempted: usize,
    pub loaded: Vec<String>,
}

impl From<PreloadProgress> for PreloadResponse {
    fn from(p: PreloadProgress) -> Self {
        Self {
            progress: p.progress,
            total: p.total,
            attempted: p.attempted,
            loaded: p.loaded.into_iter().collect(),
        }
    }
}

/// Response body for `POST /load`
#[derive(Debug, Clone, Serialize)]
pub struct LoadResponse {
    pub status: LoadStatus,
    pub url: String,
    pub retry_count: u32,
}

impl From<LoadState> for LoadResponse {
    fn from(state: LoadState) -> Self {
        Self {
            status: state.status,
            url: state.current_url,
            retry_count: state.retry_count,
        }
    }
}

/// Generic acknowledgement for maintenance endpoints
#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
