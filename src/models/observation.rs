//! Detector output shape shared by every detector backend.

use serde::{Deserialize, Serialize};

/// Axis-aligned box `(x1, y1, x2, y2)` in physical capture pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
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

    pub fn width(&self) -> f64 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f64 {
        self.y2 - self.y1
    }

    /// Zero for degenerate boxes.
    pub fn area(&self) -> f64 {
        self.width().max(0.0) * self.height().max(0.0)
    }

    pub fn center(&self) -> (f64, f64) {
        ((self.x1 + self.x2) / 2.0, (self.y1 + self.y2) / 2.0)
    }
}

/// One detection of the current frame. Never mutated after the detector returns it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetObservation {
    /// Persistent track id; `None` for plain per-frame detectors.
    pub id: Option<u32>,
    #[serde(rename = "box")]
    pub bbox: BoundingBox,
    pub confidence: f32,
}

impl TargetObservation {
    pub fn new(id: Option<u32>, bbox: BoundingBox, confidence: f32) -> Self {
        Self {
            id,
            bbox,
            confidence,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn box_properties() {
        let bbox = BoundingBox::new(0.0, 0.0, 10.0, 5.0);
        assert_eq!(bbox.width(), 10.0);
        assert_eq!(bbox.height(), 5.0);
        assert_eq!(bbox.area(), 50.0);
        assert_eq!(bbox.center(), (5.0, 2.5));
    }

    #[test]
    fn inverted_box_has_no_area() {
        let bbox = BoundingBox::new(10.0, 10.0, 0.0, 20.0);
        assert_eq!(bbox.area(), 0.0);
    }

    #[test]
    fn observation_serializes_box_field() {
        let obs = TargetObservation::new(Some(7), BoundingBox::new(1.0, 2.0, 3.0, 4.0), 0.9);
        let json = serde_json::to_value(obs).unwrap();
        assert_eq!(json["id"], 7);
        assert_eq!(json["box"]["x2"], 3.0);
    }
}
