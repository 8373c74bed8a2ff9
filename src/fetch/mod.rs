//! Fetch Module
//!
//! The network primitive the load machine and preloader drive. Only
//! success or failure matters here; payloads belong to the rendering layer.

mod http;
#[cfg(test)]
pub(crate) mod mock;

use async_trait::async_trait;
use thiserror::Error;

use crate::resolver::MediaKind;

pub use http::HttpFetcher;

/// Why a single fetch attempt failed. Every variant is transient from the
/// load machine's point of view and eligible for retry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("network error: {0}")]
    Network(String),

    #[error("HTTP status {0}")]
    Status(u16),

    #[error("undecodable content: {0}")]
    Decode(String),
}

/// Port for fetching a media URL.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetches `url` to completion and reports what kind of media it was.
    async fn fetch(&self, url: &str) -> Result<MediaKind, FetchError>;
}
