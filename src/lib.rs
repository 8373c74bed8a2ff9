//! Atelier Media - image resolution and caching for the portfolio site
//!
//! Resolves raw media references to canonical URLs, remembers successful
//! loads in a TTL cache, drives per-image load state with bounded retry,
//! and preloads galleries with progress reporting.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod fetch;
pub mod loader;
pub mod models;
pub mod preload;
pub mod resolver;
pub mod storage;
pub mod tasks;
pub mod visibility;

pub use api::AppState;
pub use config::Config;
pub use tasks::spawn_cleanup_task;
