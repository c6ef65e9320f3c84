//! Per-frame lock decision.
//!
//! Idle (inactive) -> Searching (active, no lock) -> Locked (active, lock held).
//! While locked, continuity is tried by persistent id first, then by IOU
//! against the previous box. If both fail the lock is dropped and the engine
//! searches again from the next frame on.

use crate::algorithm::geometry::{capture_to_screen, iou, CaptureRect, Point, ScreenGeometry};
use crate::models::observation::{BoundingBox, TargetObservation};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockPhase {
    Idle,
    Searching,
    Locked,
}

/// Lock state carried across frames.
///
/// `locked_id` and `locked_box` are cleared together on deactivation and lock loss.
/// `locked_box` without `locked_id` means the lock is held by overlap only.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LockState {
    pub active: bool,
    pub locked_id: Option<u32>,
    pub locked_box: Option<BoundingBox>,
}

impl LockState {
    pub fn phase(&self) -> LockPhase {
        match (self.active, self.locked_box) {
            (false, _) => LockPhase::Idle,
            (true, None) => LockPhase::Searching,
            (true, Some(_)) => LockPhase::Locked,
        }
    }

    pub fn is_locked(&self) -> bool {
        self.phase() == LockPhase::Locked
    }

    fn clear_lock(&mut self) {
        self.locked_id = None;
        self.locked_box = None;
    }

    fn adopt(&mut self, observation: &TargetObservation) {
        self.locked_id = observation.id;
        self.locked_box = Some(observation.bbox);
    }
}

/// What happened to the lock on one frame. Indices point into the frame's observations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LockEvent {
    Idle,
    Searching,
    Acquired { index: usize },
    Continued { index: usize },
    Reidentified { index: usize, iou: f64 },
    Lost { best_iou: f64 },
}

impl LockEvent {
    /// Index of the observation holding the lock after this frame, if any.
    pub fn locked_index(&self) -> Option<usize> {
        match self {
            LockEvent::Acquired { index }
            | LockEvent::Continued { index }
            | LockEvent::Reidentified { index, .. } => Some(*index),
            _ => None,
        }
    }
}

pub struct LockEngine {
    state: LockState,
    iou_track_threshold: f64,
    capture: CaptureRect,
    screen_center: Point,
}

impl LockEngine {
    pub fn new(iou_track_threshold: f64, capture: CaptureRect, screen: &ScreenGeometry) -> Self {
        Self {
            state: LockState::default(),
            iou_track_threshold,
            capture,
            screen_center: screen.center(),
        }
    }

    pub fn state(&self) -> &LockState {
        &self.state
    }

    /// Applies the hotkey flag. Deactivation drops the lock immediately.
    /// Returns true when the flag changed.
    pub fn set_active(&mut self, active: bool) -> bool {
        if self.state.active == active {
            return false;
        }
        self.state.active = active;
        if !active {
            self.state.clear_lock();
        }
        true
    }

    /// Clears everything, as at loop stop.
    pub fn reset(&mut self) {
        self.state = LockState::default();
    }

    /// Runs one frame's transition over the current observations.
    pub fn step(&mut self, observations: &[TargetObservation]) -> LockEvent {
        match self.state.phase() {
            LockPhase::Idle => {
                self.state.clear_lock();
                LockEvent::Idle
            }
            LockPhase::Searching => {
                match select_nearest(observations, &self.capture, self.screen_center) {
                    Some(index) => {
                        self.state.adopt(&observations[index]);
                        LockEvent::Acquired { index }
                    }
                    None => LockEvent::Searching,
                }
            }
            LockPhase::Locked => self.continue_lock(observations),
        }
    }

    fn continue_lock(&mut self, observations: &[TargetObservation]) -> LockEvent {
        if let Some(locked_id) = self.state.locked_id {
            if let Some(index) = observations.iter().position(|o| o.id == Some(locked_id)) {
                self.state.locked_box = Some(observations[index].bbox);
                return LockEvent::Continued { index };
            }
        }

        let Some(locked_box) = self.state.locked_box else {
            return LockEvent::Searching;
        };

        match best_iou_match(&locked_box, observations) {
            Some((index, overlap)) if overlap > self.iou_track_threshold => {
                self.state.adopt(&observations[index]);
                LockEvent::Reidentified {
                    index,
                    iou: overlap,
                }
            }
            best => {
                self.state.clear_lock();
                LockEvent::Lost {
                    best_iou: best.map(|(_, overlap)| overlap).unwrap_or(0.0),
                }
            }
        }
    }
}

/// Observation whose physical-screen center is closest to `screen_center`.
/// Ties resolve to the first in detector order.
pub fn select_nearest(
    observations: &[TargetObservation],
    capture: &CaptureRect,
    screen_center: Point,
) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (index, observation) in observations.iter().enumerate() {
        let (cx, cy) = observation.bbox.center();
        let dist_sq = capture_to_screen(Point::new(cx, cy), capture).distance_sq(screen_center);
        if best.map_or(true, |(_, best_dist)| dist_sq < best_dist) {
            best = Some((index, dist_sq));
        }
    }
    best.map(|(index, _)| index)
}

/// Highest IOU against `locked_box`. Ties resolve to the first in detector order.
pub fn best_iou_match(
    locked_box: &BoundingBox,
    observations: &[TargetObservation],
) -> Option<(usize, f64)> {
    let mut best: Option<(usize, f64)> = None;
    for (index, observation) in observations.iter().enumerate() {
        let overlap = iou(locked_box, &observation.bbox);
        if best.map_or(true, |(_, best_overlap)| overlap > best_overlap) {
            best = Some((index, overlap));
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obs(id: Option<u32>, x1: f64, y1: f64, x2: f64, y2: f64) -> TargetObservation {
        TargetObservation::new(id, BoundingBox::new(x1, y1, x2, y2), 0.9)
    }

    /// 1000x600 screen with a centered 320x320 capture at (340, 140).
    fn engine() -> LockEngine {
        let screen = ScreenGeometry::new(1000, 600, 1.0);
        let capture = CaptureRect::centered(&screen, 320, 320);
        LockEngine::new(0.4, capture, &screen)
    }

    fn locked_engine(id: Option<u32>, bbox: BoundingBox) -> LockEngine {
        let mut engine = engine();
        engine.set_active(true);
        engine.step(&[TargetObservation::new(id, bbox, 0.9)]);
        assert!(engine.state().is_locked());
        engine
    }

    #[test]
    fn inactive_engine_stays_idle() {
        let mut engine = engine();
        let event = engine.step(&[obs(Some(1), 150.0, 150.0, 170.0, 170.0)]);
        assert_eq!(event, LockEvent::Idle);
        assert_eq!(engine.state().phase(), LockPhase::Idle);
        assert_eq!(engine.state().locked_box, None);
    }

    #[test]
    fn activation_without_observations_searches() {
        let mut engine = engine();
        assert!(engine.set_active(true));
        assert!(!engine.set_active(true));
        assert_eq!(engine.step(&[]), LockEvent::Searching);
        assert_eq!(engine.state().phase(), LockPhase::Searching);
    }

    #[test]
    fn searching_picks_closest_to_screen_center() {
        // Screen-absolute centers (400,300) and (410,300); screen center (500,300).
        let mut engine = engine();
        engine.set_active(true);
        let observations = [
            obs(Some(1), 50.0, 150.0, 70.0, 170.0),
            obs(Some(2), 60.0, 150.0, 80.0, 170.0),
        ];
        assert_eq!(engine.step(&observations), LockEvent::Acquired { index: 1 });
        assert_eq!(engine.state().locked_id, Some(2));
        assert_eq!(engine.state().locked_box, Some(observations[1].bbox));
    }

    #[test]
    fn nearest_tie_resolves_to_first() {
        let screen = ScreenGeometry::new(1000, 600, 1.0);
        let capture = CaptureRect::centered(&screen, 320, 320);
        let observations = [
            obs(Some(1), 140.0, 150.0, 150.0, 170.0),
            obs(Some(2), 170.0, 150.0, 180.0, 170.0),
        ];
        assert_eq!(select_nearest(&observations, &capture, screen.center()), Some(0));
    }

    #[test]
    fn continuity_follows_locked_id() {
        // Lock on id=7 at (90,90,130,130); id=7 moves to (100,100,140,140).
        let mut engine = locked_engine(Some(7), BoundingBox::new(90.0, 90.0, 130.0, 130.0));
        let event = engine.step(&[obs(Some(7), 100.0, 100.0, 140.0, 140.0)]);
        assert_eq!(event, LockEvent::Continued { index: 0 });
        assert_eq!(engine.state().locked_id, Some(7));
        assert_eq!(
            engine.state().locked_box,
            Some(BoundingBox::new(100.0, 100.0, 140.0, 140.0))
        );
    }

    #[test]
    fn continuity_beats_overlap_and_distance() {
        let mut engine = locked_engine(Some(7), BoundingBox::new(150.0, 150.0, 170.0, 170.0));
        let observations = [
            // Perfect overlap with the old box and dead center, but a different id.
            obs(Some(3), 150.0, 150.0, 170.0, 170.0),
            obs(Some(7), 0.0, 0.0, 10.0, 10.0),
        ];
        assert_eq!(engine.step(&observations), LockEvent::Continued { index: 1 });
        assert_eq!(engine.state().locked_box, Some(observations[1].bbox));
    }

    #[test]
    fn reidentifies_by_overlap_when_id_changes() {
        let mut engine = locked_engine(Some(7), BoundingBox::new(100.0, 100.0, 140.0, 140.0));
        let observations = [
            obs(Some(1), 0.0, 0.0, 10.0, 10.0),
            obs(Some(9), 102.0, 102.0, 142.0, 142.0),
        ];
        let event = engine.step(&observations);
        assert!(matches!(event, LockEvent::Reidentified { index: 1, iou } if iou > 0.4));
        assert_eq!(engine.state().locked_id, Some(9));
        assert_eq!(engine.state().locked_box, Some(observations[1].bbox));
    }

    #[test]
    fn id_less_detector_keeps_lock_by_overlap() {
        let mut engine = locked_engine(None, BoundingBox::new(100.0, 100.0, 140.0, 140.0));
        assert_eq!(engine.state().locked_id, None);
        let event = engine.step(&[obs(None, 104.0, 100.0, 144.0, 140.0)]);
        assert!(matches!(event, LockEvent::Reidentified { index: 0, .. }));
        assert!(engine.state().is_locked());
    }

    #[test]
    fn lost_when_overlap_at_or_below_threshold() {
        // Locked box (0,0,10,10); only observation (50,50,60,60) id=3.
        let mut engine = locked_engine(Some(1), BoundingBox::new(0.0, 0.0, 10.0, 10.0));
        let event = engine.step(&[obs(Some(3), 50.0, 50.0, 60.0, 60.0)]);
        assert_eq!(event, LockEvent::Lost { best_iou: 0.0 });
        assert_eq!(engine.state().phase(), LockPhase::Searching);
        assert_eq!(engine.state().locked_id, None);
        assert_eq!(engine.state().locked_box, None);
    }

    #[test]
    fn overlap_equal_to_threshold_is_not_enough() {
        let screen = ScreenGeometry::new(1000, 600, 1.0);
        let capture = CaptureRect::centered(&screen, 320, 320);
        let mut engine = LockEngine::new(0.5, capture, &screen);
        engine.set_active(true);
        engine.step(&[obs(None, 0.0, 0.0, 20.0, 10.0)]);
        // Intersection 100 / union 200 = 0.5 exactly.
        let event = engine.step(&[obs(None, 0.0, 0.0, 10.0, 10.0)]);
        assert_eq!(event, LockEvent::Lost { best_iou: 0.5 });
    }

    #[test]
    fn empty_frame_while_locked_loses_lock_then_reacquires() {
        let mut engine = locked_engine(Some(4), BoundingBox::new(150.0, 150.0, 170.0, 170.0));
        assert_eq!(engine.step(&[]), LockEvent::Lost { best_iou: 0.0 });
        assert_eq!(engine.state().phase(), LockPhase::Searching);

        let event = engine.step(&[obs(Some(5), 10.0, 10.0, 20.0, 20.0)]);
        assert_eq!(event, LockEvent::Acquired { index: 0 });
        assert_eq!(engine.state().locked_id, Some(5));
    }

    #[test]
    fn best_overlap_tie_resolves_to_first() {
        let locked = BoundingBox::new(10.0, 10.0, 20.0, 20.0);
        let observations = [
            obs(Some(1), 12.0, 10.0, 22.0, 20.0),
            obs(Some(2), 8.0, 10.0, 18.0, 20.0),
        ];
        let (index, _) = best_iou_match(&locked, &observations).unwrap();
        assert_eq!(index, 0);
        assert_eq!(best_iou_match(&locked, &[]), None);
    }

    #[test]
    fn deactivation_clears_lock_immediately() {
        let mut engine = locked_engine(Some(7), BoundingBox::new(100.0, 100.0, 140.0, 140.0));
        assert!(engine.set_active(false));
        assert_eq!(engine.state().phase(), LockPhase::Idle);
        assert_eq!(engine.state().locked_id, None);
        assert_eq!(engine.state().locked_box, None);
    }
}
