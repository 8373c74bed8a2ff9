//! Storage Module
//!
//! Client for the object storage proxy that the admin dashboard uploads
//! project images and blueprints through.

mod client;

pub use client::{find_orphans, StorageClient};
