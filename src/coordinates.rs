//! Conversion between the model's normalized coordinate space and primary
//! monitor pixels.
//!
//! The vision model reports positions in a [0, 1000] × [0, 1000] grid
//! regardless of screen resolution. Everything here works in primary-monitor
//! pixel space; the capture layer normalizes multi-monitor offsets and DPI
//! scaling away before a frame reaches this module.

use crate::config::CalibrationConfig;

/// Upper bound of the model's normalized coordinate range.
pub const NORMALIZED_MAX: f64 = 1000.0;

/// Scales a normalized point onto a screen of the given pixel dimensions.
///
/// Out-of-range inputs are not rejected here; bounds enforcement happens in
/// the action executor via [`clamp_to_screen`].
pub fn to_pixels(norm_x: f64, norm_y: f64, screen_w: u32, screen_h: u32) -> (i32, i32) {
    let px = (norm_x / NORMALIZED_MAX * screen_w as f64).round() as i32;
    let py = (norm_y / NORMALIZED_MAX * screen_h as f64).round() as i32;
    (px, py)
}

/// Inverse of [`to_pixels`]. Used by calibration tooling, not the main loop.
pub fn to_normalized(px: i32, py: i32, screen_w: u32, screen_h: u32) -> (f64, f64) {
    let nx = px as f64 / screen_w as f64 * NORMALIZED_MAX;
    let ny = py as f64 / screen_h as f64 * NORMALIZED_MAX;
    (nx, ny)
}

pub fn validate_normalized(x: f64, y: f64) -> bool {
    (0.0..=NORMALIZED_MAX).contains(&x) && (0.0..=NORMALIZED_MAX).contains(&y)
}

pub fn validate_pixel(x: i32, y: i32, screen_w: u32, screen_h: u32) -> bool {
    x >= 0 && y >= 0 && x < screen_w as i32 && y < screen_h as i32
}

/// Clamps a pixel coordinate to `[0, dimension - 1]`.
pub fn clamp_to_screen(x: i32, y: i32, screen_w: u32, screen_h: u32) -> (i32, i32) {
    let cx = x.clamp(0, screen_w as i32 - 1);
    let cy = y.clamp(0, screen_h as i32 - 1);
    (cx, cy)
}

/// Persisted pixel delta applied to every resolved click/drag coordinate
/// after scaling.
#[derive(Debug, Clone, Copy, Default)]
pub struct CalibrationOffset {
    pub dx: i32,
    pub dy: i32,
}

impl CalibrationOffset {
    pub fn apply(&self, x: i32, y: i32) -> (i32, i32) {
        (x + self.dx, y + self.dy)
    }

    pub fn is_zero(&self) -> bool {
        self.dx == 0 && self.dy == 0
    }
}

impl From<CalibrationConfig> for CalibrationOffset {
    fn from(cfg: CalibrationConfig) -> Self {
        Self {
            dx: cfg.offset_x,
            dy: cfg.offset_y,
        }
    }
}

/// Axis-aligned box in normalized coordinates. Some models answer a
/// pointing request with a region; intent decoding collapses it to the
/// center before pixel resolution.
#[derive(Debug, Clone, Copy, PartialEq)]
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

    pub fn center(&self) -> (f64, f64) {
        ((self.x1 + self.x2) / 2.0, (self.y1 + self.y2) / 2.0)
    }
}
