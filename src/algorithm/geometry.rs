//! Box overlap and the three coordinate frames.
//!
//! - physical-capture: origin at the capture rect's top-left, raw detector pixels
//! - physical-screen: origin at the monitor's top-left
//! - logical-display: physical-screen scaled by `1 / scaling_factor` (overlay space)
//!
//! Everything stays `f64` until the final output boundary.

use serde::{Deserialize, Serialize};

use crate::models::observation::BoundingBox;
use crate::models::payload::LogicalRect;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_sq(&self, other: Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }
}

/// Intersection-over-union of two axis-aligned boxes; 0 when they do not overlap.
pub fn iou(a: &BoundingBox, b: &BoundingBox) -> f64 {
    let ix = (a.x2.min(b.x2) - a.x1.max(b.x1)).max(0.0);
    let iy = (a.y2.min(b.y2) - a.y1.max(b.y1)).max(0.0);
    let intersection = ix * iy;
    let union = a.area() + b.area() - intersection;

    if union > 0.0 {
        intersection / union
    } else {
        0.0
    }
}

/// Physical size of the monitor plus its DPI scale (1.0 = 100%, 1.25 = 125%).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenGeometry {
    pub width: u32,
    pub height: u32,
    pub scaling_factor: f64,
}

impl ScreenGeometry {
    pub fn new(width: u32, height: u32, scaling_factor: f64) -> Self {
        Self {
            width,
            height,
            scaling_factor,
        }
    }

    /// Physical-screen center of the monitor.
    pub fn center(&self) -> Point {
        Point::new(self.width as f64 / 2.0, self.height as f64 / 2.0)
    }

    /// Logical (DPI-scaled) monitor size, truncated.
    pub fn logical_size(&self) -> (u32, u32) {
        (
            (self.width as f64 / self.scaling_factor) as u32,
            (self.height as f64 / self.scaling_factor) as u32,
        )
    }
}

/// Capture region in physical-screen pixels. Computed once at loop start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureRect {
    pub left: i32,
    pub top: i32,
    pub width: u32,
    pub height: u32,
}

impl CaptureRect {
    /// Region of `physical_width x physical_height` centered on the screen.
    pub fn centered(screen: &ScreenGeometry, physical_width: u32, physical_height: u32) -> Self {
        Self {
            left: (screen.width as i32 - physical_width as i32).div_euclid(2),
            top: (screen.height as i32 - physical_height as i32).div_euclid(2),
            width: physical_width,
            height: physical_height,
        }
    }

    /// Center of the region in physical-capture coordinates (the aim point).
    pub fn center(&self) -> Point {
        Point::new(self.width as f64 / 2.0, self.height as f64 / 2.0)
    }
}

pub fn capture_to_screen(p: Point, capture: &CaptureRect) -> Point {
    Point::new(p.x + capture.left as f64, p.y + capture.top as f64)
}

pub fn screen_to_capture(p: Point, capture: &CaptureRect) -> Point {
    Point::new(p.x - capture.left as f64, p.y - capture.top as f64)
}

pub fn physical_to_logical(p: Point, scaling_factor: f64) -> Point {
    Point::new(p.x / scaling_factor, p.y / scaling_factor)
}

pub fn logical_to_physical(p: Point, scaling_factor: f64) -> Point {
    Point::new(p.x * scaling_factor, p.y * scaling_factor)
}

/// Logical overlay rectangle of the capture region, centered on the logical screen.
pub fn scope_rect(screen: &ScreenGeometry, logical_width: u32, logical_height: u32) -> LogicalRect {
    let (screen_w, screen_h) = screen.logical_size();
    LogicalRect::new(
        (screen_w as i32 - logical_width as i32).div_euclid(2),
        (screen_h as i32 - logical_height as i32).div_euclid(2),
        logical_width as i32,
        logical_height as i32,
    )
}

/// Converts a physical-capture box into a logical rect anchored at the scope's top-left.
pub fn box_to_logical_rect(bbox: &BoundingBox, scope: &LogicalRect, scaling_factor: f64) -> LogicalRect {
    let top_left = physical_to_logical(Point::new(bbox.x1, bbox.y1), scaling_factor);
    let width = bbox.width() / scaling_factor;
    let height = bbox.height() / scaling_factor;
    LogicalRect::new(
        (scope.x as f64 + top_left.x) as i32,
        (scope.y as f64 + top_left.y) as i32,
        width as i32,
        height as i32,
    )
}
