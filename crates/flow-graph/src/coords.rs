//! Screen <-> canvas coordinate mapping
//!
//! The canvas is drawn with a pan offset (in screen pixels) and a zoom
//! factor. A canvas point `c` appears on screen at `c * zoom + pan`.
//! Screen points are relative to the canvas element's top-left corner.

use serde::{Deserialize, Serialize};

use crate::error::{GraphError, Result};
use crate::types::Position;

/// Smallest zoom the viewport accepts
pub const MIN_ZOOM: f64 = 0.1;

/// Largest zoom the viewport accepts
pub const MAX_ZOOM: f64 = 4.0;

/// A pixel position inside the canvas element
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
}

impl ScreenPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Current pan and zoom of the canvas
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// Horizontal pan in screen pixels
    pub x: f64,
    /// Vertical pan in screen pixels
    pub y: f64,
    zoom: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            zoom: 1.0,
        }
    }
}

impl Viewport {
    /// Create a viewport; zoom must be finite and within `MIN_ZOOM..=MAX_ZOOM`
    pub fn new(x: f64, y: f64, zoom: f64) -> Result<Self> {
        if !zoom.is_finite() || !(MIN_ZOOM..=MAX_ZOOM).contains(&zoom) {
            return Err(GraphError::InvalidZoom(zoom));
        }
        Ok(Self { x, y, zoom })
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    /// Shift the pan by a screen-space delta
    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        self.x += dx;
        self.y += dy;
    }

    /// Zoom by `factor` keeping the canvas point under `anchor` fixed
    ///
    /// The resulting zoom is clamped to the accepted range.
    pub fn zoom_at(&mut self, anchor: ScreenPoint, factor: f64) {
        if !factor.is_finite() || factor <= 0.0 {
            log::warn!("Ignoring zoom by invalid factor {}", factor);
            return;
        }
        let fixed = screen_to_canvas(anchor, self);
        self.zoom = (self.zoom * factor).clamp(MIN_ZOOM, MAX_ZOOM);
        self.x = anchor.x - fixed.x * self.zoom;
        self.y = anchor.y - fixed.y * self.zoom;
    }
}

/// Convert a screen point to canvas coordinates
pub fn screen_to_canvas(point: ScreenPoint, viewport: &Viewport) -> Position {
    Position::new(
        (point.x - viewport.x) / viewport.zoom,
        (point.y - viewport.y) / viewport.zoom,
    )
}

/// Convert a canvas position to screen coordinates
pub fn canvas_to_screen(position: Position, viewport: &Viewport) -> ScreenPoint {
    ScreenPoint::new(
        position.x * viewport.zoom + viewport.x,
        position.y * viewport.zoom + viewport.y,
    )
}
