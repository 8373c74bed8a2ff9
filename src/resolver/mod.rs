//! Resolver Module
//!
//! Maps raw media references to canonical fetchable URLs and classifies
//! them as image or video content.

mod kind;
mod url;


pub use kind::MediaKind;
pub use url::{file_name, UrlResolver};
