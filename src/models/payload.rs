//! Overlay drawing payload and session status.

use serde::{Deserialize, Serialize};

/// RGB color triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const BLACK: Rgb = Rgb(0, 0, 0);
    pub const RED: Rgb = Rgb(255, 0, 0);
    pub const GREEN: Rgb = Rgb(0, 255, 0);
}

/// Rectangle in logical display pixels (origin at monitor top-left).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogicalRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl LogicalRect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// A null rect carries no area and is not painted.
    pub fn is_null(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetItem {
    pub rect: LogicalRect,
    pub color: Rgb,
}

/// Per-frame overlay payload. Ownership moves to the render sink on push.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawingPayload {
    pub scope_rect: LogicalRect,
    pub target_items: Vec<TargetItem>,
    pub status_text: String,
    pub status_color: Rgb,
    pub show_scope: bool,
}

impl DrawingPayload {
    /// Payload that wipes the overlay.
    pub fn cleared() -> Self {
        Self {
            scope_rect: LogicalRect::default(),
            target_items: Vec::new(),
            status_text: String::new(),
            status_color: Rgb::BLACK,
            show_scope: false,
        }
    }

    pub fn is_cleared(&self) -> bool {
        self.scope_rect.is_null()
            && self.target_items.is_empty()
            && self.status_text.is_empty()
            && !self.show_scope
    }
}

impl Default for DrawingPayload {
    fn default() -> Self {
        Self::cleared()
    }
}

/// Status value published after every loop iteration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    pub session_id: String,
    pub fps: f64,
    pub active: bool,
    pub locked: bool,
    /// Iterations completed since start.
    pub frames: u64,
    /// Unix timestamp in ms of the last update.
    pub updated_at_ms: i64,
    /// False once the worker has run its cleanup.
    pub running: bool,
}
