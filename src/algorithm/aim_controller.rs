//! Proportional aim controller: locked box -> relative pointer displacement.

use crate::algorithm::geometry::Point;
use crate::models::config::RunConfig;
use crate::models::observation::BoundingBox;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AimController {
    /// `aimSpeed / 200`.
    pub gain: f64,
    pub offset_x_pct: f64,
    pub offset_y_pct: f64,
    /// Physical pixels; errors within it on both axes produce no movement.
    pub deadzone: f64,
}

impl AimController {
    pub fn from_config(config: &RunConfig) -> Self {
        Self {
            gain: config.gain(),
            offset_x_pct: config.offset_x_pct,
            offset_y_pct: config.offset_y_pct,
            deadzone: config.deadzone,
        }
    }

    /// Box center shifted by the offsets, as a share of the box's own size.
    pub fn target_point(&self, bbox: &BoundingBox) -> Point {
        let (cx, cy) = bbox.center();
        Point::new(
            cx + bbox.width() * self.offset_x_pct / 100.0,
            cy + bbox.height() * self.offset_y_pct / 100.0,
        )
    }

    /// Error from the aim point (capture center) to the target point, physical capture pixels.
    pub fn error(&self, bbox: &BoundingBox, aim_point: Point) -> Point {
        let target = self.target_point(bbox);
        Point::new(target.x - aim_point.x, target.y - aim_point.y)
    }

    /// Relative move for this frame, or `None` inside the deadzone or when it rounds to zero.
    pub fn displacement(&self, bbox: &BoundingBox, aim_point: Point) -> Option<(i32, i32)> {
        let error = self.error(bbox, aim_point);
        if error.x.abs() <= self.deadzone && error.y.abs() <= self.deadzone {
            return None;
        }

        let dx = (error.x * self.gain).round() as i32;
        let dy = (error.y * self.gain).round() as i32;
        if dx == 0 && dy == 0 {
            return None;
        }
        Some((dx, dy))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller(aim_speed: f64) -> AimController {
        AimController {
            gain: aim_speed / 200.0,
            offset_x_pct: 0.0,
            offset_y_pct: 0.0,
            deadzone: 1.5,
        }
    }

    const AIM: Point = Point { x: 160.0, y: 160.0 };

    #[test]
    fn centered_target_does_not_move() {
        let bbox = BoundingBox::new(140.0, 140.0, 180.0, 180.0);
        assert_eq!(controller(20.0).error(&bbox, AIM), Point::new(0.0, 0.0));
        assert_eq!(controller(20.0).displacement(&bbox, AIM), None);
    }

    #[test]
    fn error_inside_deadzone_is_suppressed() {
        let bbox = BoundingBox::new(141.5, 138.5, 181.5, 178.5);
        assert_eq!(controller(200.0).displacement(&bbox, AIM), None);
    }

    #[test]
    fn error_outside_deadzone_on_one_axis_moves() {
        let bbox = BoundingBox::new(141.6, 140.0, 181.6, 180.0);
        assert_eq!(controller(200.0).displacement(&bbox, AIM), Some((2, 0)));
    }

    #[test]
    fn zero_after_rounding_is_suppressed() {
        // Error 4px at gain 0.1 -> 0.4 -> 0.
        let bbox = BoundingBox::new(144.0, 140.0, 184.0, 180.0);
        assert_eq!(controller(20.0).displacement(&bbox, AIM), None);
    }

    #[test]
    fn displacement_scales_with_aim_speed() {
        let bbox = BoundingBox::new(240.0, 100.0, 280.0, 140.0);
        // Error (100, -40).
        assert_eq!(controller(20.0).displacement(&bbox, AIM), Some((10, -4)));
        assert_eq!(controller(40.0).displacement(&bbox, AIM), Some((20, -8)));
        assert_eq!(controller(80.0).displacement(&bbox, AIM), Some((40, -16)));
    }

    #[test]
    fn offsets_scale_with_box_size() {
        let mut aim = controller(200.0);
        aim.offset_y_pct = -25.0;
        let small = BoundingBox::new(150.0, 150.0, 170.0, 170.0);
        let large = BoundingBox::new(120.0, 120.0, 200.0, 200.0);
        assert_eq!(aim.target_point(&small), Point::new(160.0, 155.0));
        assert_eq!(aim.target_point(&large), Point::new(160.0, 140.0));
        assert_eq!(aim.displacement(&large, AIM), Some((0, -20)));
    }

    #[test]
    fn rounding_is_half_away_from_zero() {
        // Error (-25, 25) at gain 0.1 -> (-2.5, 2.5).
        let bbox = BoundingBox::new(115.0, 165.0, 155.0, 205.0);
        assert_eq!(controller(20.0).displacement(&bbox, AIM), Some((-3, 3)));
    }
}
