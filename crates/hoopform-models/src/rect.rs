use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::joint::Point2;

/// A normalized rectangle (0.0 to 1.0) representing a relative region of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct NormalizedRect {
    /// X coordinate of the top-left corner (0.0 = left, 1.0 = right)
    pub x: f64,
    /// Y coordinate of the top-left corner (0.0 = top, 1.0 = bottom)
    pub y: f64,
    /// Width of the rectangle (0.0 to 1.0)
    pub width: f64,
    /// Height of the rectangle (0.0 to 1.0)
    pub height: f64,
}

impl NormalizedRect {
    /// Create a new normalized rectangle.
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// The whole frame.
    pub fn full() -> Self {
        Self::new(0.0, 0.0, 1.0, 1.0)
    }

    /// Square region of half-size `radius` centered on `center`, clipped to the frame.
    pub fn around(center: Point2, radius: f64) -> Self {
        let x0 = (center.x - radius).clamp(0.0, 1.0);
        let y0 = (center.y - radius).clamp(0.0, 1.0);
        let x1 = (center.x + radius).clamp(0.0, 1.0);
        let y1 = (center.y + radius).clamp(0.0, 1.0);
        Self::new(x0, y0, x1 - x0, y1 - y0)
    }

    /// Check if the rectangle is valid (within 0.0-1.0 range).
    pub fn is_valid(&self) -> bool {
        self.x >= 0.0
            && self.y >= 0.0
            && self.width > 0.0
            && self.height > 0.0
            && self.x + self.width <= 1.001 // Allow small epsilon for float precision
            && self.y + self.height <= 1.001
    }

    /// Whether a normalized point falls inside the rectangle.
    pub fn contains(&self, point: Point2) -> bool {
        point.x >= self.x
            && point.x <= self.x + self.width
            && point.y >= self.y
            && point.y <= self.y + self.height
    }

    /// Convert to pixel bounds `(x0, y0, x1, y1)` (exclusive end) for a frame size.
    pub fn to_pixel_bounds(&self, width: u32, height: u32) -> (u32, u32, u32, u32) {
        let fw = width as f64;
        let fh = height as f64;
        let x0 = (self.x * fw).floor().clamp(0.0, fw) as u32;
        let y0 = (self.y * fh).floor().clamp(0.0, fh) as u32;
        let x1 = ((self.x + self.width) * fw).ceil().clamp(0.0, fw) as u32;
        let y1 = ((self.y + self.height) * fh).ceil().clamp(0.0, fh) as u32;
        (x0, y0, x1, y1)
    }
}
