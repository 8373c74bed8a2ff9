//! Preload Module
//!
//! Sequentially warms a gallery's media and reports aggregate progress.

mod batch;

#[cfg(test)]
mod property_tests;

pub use batch::{PreloadHandle, PreloadProgress, Preloader, DEFAULT_PRIORITY_LIMIT};
