//! Pixel-space geometry.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Bounding box in pixel coordinates, corner form `(x1, y1, x2, y2)`.
///
/// Boxes derived from masks use inclusive max coordinates (the last true
/// row/column), matching how detections are reported by the models.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BoundingBox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl BoundingBox {
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Integer pixel rectangle clipped to a `frame_width` x `frame_height` frame.
    ///
    /// Coordinates are truncated the way array slicing truncates them; the
    /// result is at least one pixel wide and high so that every tracked box
    /// yields a crop. Returns `None` for a zero-sized frame.
    pub fn to_pixel_rect(&self, frame_width: u32, frame_height: u32) -> Option<PixelRect> {
        if frame_width == 0 || frame_height == 0 {
            return None;
        }

        let clamp = |v: f64, max: u32| -> u32 {
            if v.is_nan() {
                0
            } else {
                v.max(0.0).min(max as f64) as u32
            }
        };

        let x = clamp(self.x1, frame_width - 1);
        let y = clamp(self.y1, frame_height - 1);
        let x_end = clamp(self.x2, frame_width).max(x + 1);
        let y_end = clamp(self.y2, frame_height).max(y + 1);

        Some(PixelRect {
            x,
            y,
            width: x_end - x,
            height: y_end - y,
        })
    }
}

/// Integer rectangle inside a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}
