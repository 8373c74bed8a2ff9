//! API Module
//!
//! HTTP handlers and routing for the operator REST API. Consumers of the
//! media subsystem use the library types directly; this surface exists to
//! inspect and drive a running instance.

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
