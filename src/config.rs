//! Configuration Module
//!
//! Loads media subsystem settings from environment variables.

use std::env;
use std::time::Duration;

use crate::error::{MediaError, Result};

/// Default placeholder served for unresolvable references.
pub const DEFAULT_PLACEHOLDER_URL: &str = "/placeholder.svg";

/// Default pattern for legacy/internal storage hosts.
pub const DEFAULT_LEGACY_STORAGE_PATTERN: &str = r"^https?://[^/]+\.r2\.cloudflarestorage\.com/";

/// Media subsystem configuration.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Public base URL that bare filenames are joined onto
    pub public_base_url: Option<String>,
    /// Site origin that root-relative references (static assets, the
    /// placeholder) are fetched from; None leaves them unfetchable
    pub site_origin: Option<String>,
    /// Fallback URL for empty or unresolvable references
    pub placeholder_url: String,
    /// Regex matching legacy storage URLs that must be rewritten
    pub legacy_storage_pattern: String,
    /// Lifetime of a cached successful load, in seconds
    pub cache_ttl: u64,
    /// Automatic retries before a load is reported as failed
    pub max_retries: u32,
    /// Delay before the first retry; doubles on each subsequent one
    pub retry_base_delay_ms: u64,
    /// How many references a priority preload fetches up front
    pub preload_priority_limit: usize,
    /// Lookahead margin around the viewport for lazy loading
    pub visibility_margin: f64,
    /// HTTP server port
    pub server_port: u16,
    /// Background expiry sweep interval in seconds
    pub cleanup_interval: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `PUBLIC_BASE_URL` - Public media host (default: unset)
    /// - `SITE_ORIGIN` - Origin for root-relative fetches (default: unset)
    /// - `PLACEHOLDER_URL` - Placeholder image (default: `/placeholder.svg`)
    /// - `LEGACY_STORAGE_PATTERN` - Legacy host regex (default: R2 internal hosts)
    /// - `CACHE_TTL_SECS` - Cache TTL in seconds (default: 120)
    /// - `MAX_RETRIES` - Automatic retries (default: 3)
    /// - `RETRY_BASE_DELAY_MS` - First backoff delay (default: 1000)
    /// - `PRELOAD_PRIORITY_LIMIT` - Priority preload head size (default: 4)
    /// - `VISIBILITY_MARGIN` - Lazy-load lookahead (default: 50)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `CLEANUP_INTERVAL` - Sweep frequency in seconds (default: 1)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            public_base_url: env::var("PUBLIC_BASE_URL")
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),
            site_origin: env::var("SITE_ORIGIN")
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| is_http_url(v)),
            placeholder_url: env::var("PLACEHOLDER_URL").unwrap_or(defaults.placeholder_url),
            legacy_storage_pattern: env::var("LEGACY_STORAGE_PATTERN")
                .unwrap_or(defaults.legacy_storage_pattern),
            cache_ttl: parse_var("CACHE_TTL_SECS").unwrap_or(defaults.cache_ttl),
            max_retries: parse_var("MAX_RETRIES").unwrap_or(defaults.max_retries),
            retry_base_delay_ms: parse_var("RETRY_BASE_DELAY_MS")
                .unwrap_or(defaults.retry_base_delay_ms),
            preload_priority_limit: parse_var("PRELOAD_PRIORITY_LIMIT")
                .unwrap_or(defaults.preload_priority_limit),
            visibility_margin: parse_var("VISIBILITY_MARGIN").unwrap_or(defaults.visibility_margin),
            server_port: parse_var("SERVER_PORT").unwrap_or(defaults.server_port),
            cleanup_interval: parse_var("CLEANUP_INTERVAL").unwrap_or(defaults.cleanup_interval),
        }
    }

    /// Strict validation of the public base URL.
    ///
    /// This is the only place a missing or malformed base is an error;
    /// resolution itself degrades to the placeholder instead.
    pub fn validate(&self) -> Result<()> {
        match self.public_base_url.as_deref() {
            None => Err(MediaError::Config("PUBLIC_BASE_URL is not set".to_string())),
            Some(base) if !is_http_url(base) => Err(MediaError::Config(format!(
                "PUBLIC_BASE_URL must start with http:// or https://, got '{}'",
                base
            ))),
            Some(_) => Ok(()),
        }
    }

    /// Cache TTL as a Duration.
    pub fn cache_ttl_duration(&self) -> Duration {
        Duration::from_secs(self.cache_ttl)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            public_base_url: None,
            site_origin: None,
            placeholder_url: DEFAULT_PLACEHOLDER_URL.to_string(),
            legacy_storage_pattern: DEFAULT_LEGACY_STORAGE_PATTERN.to_string(),
            cache_ttl: 120,
            max_retries: 3,
            retry_base_delay_ms: 1000,
            preload_priority_limit: 4,
            visibility_margin: 50.0,
            server_port: 3000,
            cleanup_interval: 1,
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

/// Returns true for absolute `http`/`https` URLs.
pub fn is_http_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}
