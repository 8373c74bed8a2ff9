//! Loader Module
//!
//! Per-image load state machine with bounded exponential-backoff retry,
//! manual retry, and detachment.

mod driver;
mod state;

pub use driver::{ImageLoader, LoadCallbacks, LoadHandle};
pub use state::{
    backoff_delay, cache_busted_url, LoadMachine, LoadState, LoadStatus, RetryPolicy, Transition,
};
