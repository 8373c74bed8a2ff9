//! API Handlers
//!
//! HTTP request handlers for the operator endpoints.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};

use crate::cache::{self, MediaCache, SharedCache};
use crate::config::Config;
use crate::error::{MediaError, Result};
use crate::fetch::{Fetcher, HttpFetcher};
use crate::loader::{ImageLoader, LoadCallbacks, RetryPolicy};
use crate::models::{
    CacheEntryResponse, HealthResponse, LoadRequest, LoadResponse, MessageResponse,
    PreloadRequest, PreloadResponse, ResolveQuery, ResolveResponse, StatsResponse,
};
use crate::preload::Preloader;
use crate::resolver::UrlResolver;

/// Application state shared across all handlers.
///
/// The resolver memo and the cache are process-wide; every handler sees
/// the same instances.
#[derive(Clone)]
pub struct AppState {
    pub resolver: Arc<UrlResolver>,
    /// Thread-safe cache store
    pub cache: SharedCache,
    pub fetcher: Arc<dyn Fetcher>,
    pub loader: ImageLoader,
    pub preload_priority_limit: usize,
}

impl AppState {
    /// Wires the components together around an explicit fetcher.
    pub fn new(
        resolver: Arc<UrlResolver>,
        cache: SharedCache,
        fetcher: Arc<dyn Fetcher>,
        policy: RetryPolicy,
        preload_priority_limit: usize,
    ) -> Self {
        let loader = ImageLoader::new(resolver.clone(), cache.clone(), fetcher.clone(), policy);
        Self {
            resolver,
            cache,
            fetcher,
            loader,
            preload_priority_limit,
        }
    }

    /// Creates a new AppState from configuration, fetching over HTTP.
    pub fn from_config(config: &Config) -> Result<Self> {
        let resolver = Arc::new(UrlResolver::from_config(config));
        let cache = cache::shared(MediaCache::new(config.cache_ttl_duration()));

        let fetcher = HttpFetcher::from_config(config)?;

        Ok(Self::new(
            resolver,
            cache,
            Arc::new(fetcher),
            RetryPolicy::from_config(config),
            config.preload_priority_limit,
        ))
    }
}

/// Handler for GET /resolve
pub async fn resolve_handler(
    State(state): State<AppState>,
    Query(query): Query<ResolveQuery>,
) -> Json<ResolveResponse> {
    let url = state.resolver.resolve(query.reference.as_deref());
    Json(ResolveResponse {
        reference: query.reference,
        url,
    })
}

/// Handler for GET /cache/stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let cache = state.cache.read().await;
    Json(StatsResponse::from(cache.stats()))
}

/// Handler for GET /cache/:key
///
/// The key is a canonical URL, percent-encoded into the path.
pub async fn get_cache_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<CacheEntryResponse>> {
    // Write lock: a stale entry is evicted by the lookup
    let mut cache = state.cache.write().await;
    let media = cache
        .get(&key)
        .ok_or_else(|| MediaError::NotFound(key.clone()))?;
    let now = cache.now_ms();
    let ttl_remaining_ms = cache
        .peek(&key)
        .map(|entry| entry.ttl_remaining_ms(now))
        .unwrap_or(0);

    Ok(Json(CacheEntryResponse {
        key,
        media,
        ttl_remaining_ms,
    }))
}

/// Handler for DELETE /cache/:key
pub async fn delete_cache_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<MessageResponse>> {
    if state.cache.write().await.remove(&key) {
        Ok(Json(MessageResponse::new(format!("Removed '{}' from cache", key))))
    } else {
        Err(MediaError::NotFound(key))
    }
}

/// Handler for DELETE /cache
pub async fn clear_cache_handler(State(state): State<AppState>) -> Json<MessageResponse> {
    state.cache.write().await.clear();
    Json(MessageResponse::new("Cache cleared"))
}

/// Handler for DELETE /resolver/memo
pub async fn clear_memo_handler(State(state): State<AppState>) -> Json<MessageResponse> {
    state.resolver.clear_memo();
    Json(MessageResponse::new("Resolver memo cleared"))
}

/// Handler for POST /preload
///
/// Runs one batch to completion and reports where it ended.
pub async fn preload_handler(
    State(state): State<AppState>,
    Json(req): Json<PreloadRequest>,
) -> Result<Json<PreloadResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(MediaError::InvalidRequest(error_msg));
    }

    // A fresh preloader per request so concurrent callers never supersede
    // each other's batches
    let preloader = Preloader::new(
        state.resolver.clone(),
        state.cache.clone(),
        state.fetcher.clone(),
        state.preload_priority_limit,
    );
    let done = preloader.preload(&req.urls, req.priority).wait().await;

    Ok(Json(PreloadResponse::from(done)))
}

/// Handler for POST /load
///
/// Drives one load, retries included, until it settles.
pub async fn load_handler(
    State(state): State<AppState>,
    Json(req): Json<LoadRequest>,
) -> Json<LoadResponse> {
    let mut handle = state
        .loader
        .load(req.reference.as_deref(), LoadCallbacks::new())
        .await;
    let settled = handle.wait_terminal().await;
    Json(LoadResponse::from(settled))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
