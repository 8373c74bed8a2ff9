//! API Routes
//!
//! Configures the Axum router with the operator endpoints.

use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    clear_cache_handler, clear_memo_handler, delete_cache_handler, get_cache_handler,
    health_handler, load_handler, preload_handler, resolve_handler, stats_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `GET /health` - Health check
/// - `GET /resolve?reference=` - Canonical URL for a reference
/// - `GET /cache/stats` - Cache statistics
/// - `GET /cache/:key` - Inspect one cached URL
/// - `DELETE /cache/:key` - Drop one cached URL
/// - `DELETE /cache` - Drop everything
/// - `DELETE /resolver/memo` - Forget memoised resolutions
/// - `POST /preload` - Run a preload batch to completion
/// - `POST /load` - Load one reference, retries included
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // `/cache/stats` is matched ahead of the `:key` capture
    Router::new()
        .route("/health", get(health_handler))
        .route("/resolve", get(resolve_handler))
        .route("/cache", delete(clear_cache_handler))
        .route("/cache/stats", get(stats_handler))
        .route(
            "/cache/:key",
            get(get_cache_handler).delete(delete_cache_handler),
        )
        .route("/resolver/memo", delete(clear_memo_handler))
        .route("/preload", post(preload_handler))
        .route("/load", post(load_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
