//! Visibility Module
//!
//! One-shot lazy-loading gate: a load waits until its element comes within
//! a lookahead margin of the viewport, unless it has priority.

mod gate;

pub use gate::{ElementBounds, Viewport, VisibilityGate, DEFAULT_MARGIN};
