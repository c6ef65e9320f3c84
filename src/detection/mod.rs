//! Detector adapter contract.
//!
//! The detector is a black box: a frame goes in, observations come out.
//! Per-frame detectors leave `id` empty; tracking detectors fill it with a
//! persistent track id. The lock engine handles both.

use crate::capture::frame_source::RawFrame;
use crate::models::observation::TargetObservation;

/// Inference knobs handed through to the detector on every call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InferenceParams {
    pub confidence: f32,
    /// NMS IOU threshold.
    pub iou: f32,
    pub max_detections: u32,
    /// Square model input size.
    pub image_size: u32,
    pub half_precision: bool,
    pub augment: bool,
}

/// Common interface for object detectors.
pub trait Detector: Send {
    /// Detect objects in one frame. Boxes are in the frame's pixel space.
    /// Blocking; an error is fatal to the loop.
    fn infer(
        &mut self,
        frame: &RawFrame,
        params: &InferenceParams,
    ) -> Result<Vec<TargetObservation>, String>;

    /// Detector name (for logging).
    fn name(&self) -> &str;

    /// Frees model resources. Called once during cleanup.
    fn release(&mut self) {}
}

impl<D: Detector + ?Sized> Detector for Box<D> {
    fn infer(
        &mut self,
        frame: &RawFrame,
        params: &InferenceParams,
    ) -> Result<Vec<TargetObservation>, String> {
        (**self).infer(frame, params)
    }

    fn name(&self) -> &str {
        (**self).name()
    }

    fn release(&mut self) {
        (**self).release()
    }
}
