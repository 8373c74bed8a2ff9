//! Visibility gate.

use tokio::sync::watch;
use tracing::debug;

/// Default lookahead around the viewport, in layout units.
pub const DEFAULT_MARGIN: f64 = 50.0;

/// Vertical extent of the scrolled viewport.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub top: f64,
    pub bottom: f64,
}

impl Viewport {
    pub fn new(top: f64, bottom: f64) -> Self {
        Self { top, bottom }
    }
}

/// Vertical extent of the element awaiting its image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElementBounds {
    pub top: f64,
    pub bottom: f64,
}

impl ElementBounds {
    pub fn new(top: f64, bottom: f64) -> Self {
        Self { top, bottom }
    }

    /// True if the element overlaps the viewport grown by `margin` on both
    /// edges. Touching edges count as overlap.
    pub fn is_near(&self, viewport: Viewport, margin: f64) -> bool {
        self.top <= viewport.bottom + margin && self.bottom >= viewport.top - margin
    }
}

// == Visibility Gate ==
/// Opens once, either at construction for priority content or on the
/// first observation that finds the element near the viewport. Later
/// observations are ignored.
#[derive(Debug)]
pub struct VisibilityGate {
    open: watch::Sender<bool>,
    margin: f64,
}

impl VisibilityGate {
    pub fn new(priority: bool, margin: f64) -> Self {
        let (open, _) = watch::channel(priority);
        Self { open, margin }
    }

    /// Gate using the configured lookahead margin.
    pub fn from_config(priority: bool, config: &crate::config::Config) -> Self {
        Self::new(priority, config.visibility_margin)
    }

    pub fn is_open(&self) -> bool {
        *self.open.borrow()
    }

    pub fn margin(&self) -> f64 {
        self.margin
    }

    /// Reports the element's current position. Returns whether the gate is
    /// open afterwards.
    pub fn observe(&self, viewport: Viewport, element: ElementBounds) -> bool {
        if self.is_open() {
            return true;
        }
        if !element.is_near(viewport, self.margin) {
            return false;
        }

        debug!(
            "Element at {}..{} entered lookahead of viewport {}..{}",
            element.top, element.bottom, viewport.top, viewport.bottom
        );
        self.open.send_replace(true);
        true
    }

    /// Resolves once the gate is open.
    pub async fn opened(&self) {
        let mut rx = self.open.subscribe();
        // The sender lives in self, so the channel cannot close while we wait
        let _ = rx.wait_for(|open| *open).await;
    }
}
