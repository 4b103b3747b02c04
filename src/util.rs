//! Geometry helpers for mapping host pointer coordinates onto the canvas surface.

use crate::presence::Point;

/// Axis-aligned bounding box of the interactive surface, in client coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    /// Creates a new rectangle. Width/height must be positive and finite.
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Option<Self> {
        let finite = x.is_finite() && y.is_finite() && width.is_finite() && height.is_finite();
        if !finite || width <= 0.0 || height <= 0.0 {
            None
        } else {
            Some(Self {
                x,
                y,
                width,
                height,
            })
        }
    }

    /// Returns true if the client-space point lies inside the rectangle
    /// (inclusive min, exclusive max).
    pub fn contains(&self, client_x: f64, client_y: f64) -> bool {
        client_x >= self.x
            && client_y >= self.y
            && client_x < self.x + self.width
            && client_y < self.y + self.height
    }

    /// Converts client coordinates to surface-local coordinates.
    ///
    /// The result is not clamped; callers decide whether out-of-bounds points
    /// are meaningful.
    pub fn to_local(&self, client_x: f64, client_y: f64) -> Point {
        Point {
            x: client_x - self.x,
            y: client_y - self.y,
        }
    }
}
