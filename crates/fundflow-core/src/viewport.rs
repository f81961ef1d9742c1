//! # Viewport
//!
//! Two layers of view state:
//! - `Viewport`: the default frame, a box around every node plus padding,
//!   recomputed on the refit cadence.
//! - `ViewTransform`: the interactive zoom/pan applied on top of it, which
//!   overrides the default until it is reset.

#![allow(clippy::float_arithmetic)]

use crate::primitives::MIN_ZOOM;
use crate::{FlowError, Point};
use serde::{Deserialize, Serialize};

// =============================================================================
// VIEWPORT
// =============================================================================

/// Axis-aligned frame in layout coordinates, in SVG `viewBox` order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub min_x: f64,
    pub min_y: f64,
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    /// Fit every point plus `padding` on all sides.
    ///
    /// The bounds start at the origin, so the origin is always in frame and
    /// an empty scene still yields a `2 * padding` square.
    #[must_use]
    pub fn fit(points: impl IntoIterator<Item = Point>, padding: f64) -> Self {
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (0.0_f64, 0.0_f64, 0.0_f64, 0.0_f64);
        for p in points {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        Self {
            min_x: min_x - padding,
            min_y: min_y - padding,
            width: max_x - min_x + 2.0 * padding,
            height: max_y - min_y + 2.0 * padding,
        }
    }

    #[must_use]
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.min_x
            && p.y >= self.min_y
            && p.x <= self.min_x + self.width
            && p.y <= self.min_y + self.height
    }

    /// The `viewBox` attribute value.
    #[must_use]
    pub fn view_box(&self) -> String {
        format!(
            "{:.2} {:.2} {:.2} {:.2}",
            self.min_x, self.min_y, self.width, self.height
        )
    }
}

// =============================================================================
// VIEW TRANSFORM
// =============================================================================

/// Interactive zoom (`k`) and pan (`x`, `y`), applied as
/// `translate(x, y) scale(k)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewTransform {
    pub k: f64,
    pub x: f64,
    pub y: f64,
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl ViewTransform {
    pub const IDENTITY: Self = Self {
        k: 1.0,
        x: 0.0,
        y: 0.0,
    };

    /// Scale by `factor` keeping `anchor` fixed on screen.
    ///
    /// The resulting zoom never drops below `MIN_ZOOM`.
    pub fn zoom_by(&mut self, factor: f64, anchor: Point) -> Result<(), FlowError> {
        if !factor.is_finite() || factor <= 0.0 {
            return Err(FlowError::InvalidConfig {
                field: "zoom factor",
                value: factor.to_string(),
                reason: "must be a positive finite number",
            });
        }
        let k = (self.k * factor).max(MIN_ZOOM);
        let ratio = k / self.k;
        self.x = anchor.x - (anchor.x - self.x) * ratio;
        self.y = anchor.y - (anchor.y - self.y) * ratio;
        self.k = k;
        Ok(())
    }

    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        if dx.is_finite() && dy.is_finite() {
            self.x += dx;
            self.y += dy;
        }
    }

    pub fn reset(&mut self) {
        *self = Self::IDENTITY;
    }

    #[must_use]
    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    /// The SVG `transform` attribute value.
    #[must_use]
    pub fn to_svg(&self) -> String {
        format!(
            "translate({:.2},{:.2}) scale({:.4})",
            self.x, self.y, self.k
        )
    }
}
