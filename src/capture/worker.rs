//! The detect -> lock -> aim loop, run on one dedicated thread.
//!
//! Per iteration: observe the hotkey flag, capture, detect, step the lock
//! engine, actuate, push the overlay payload, publish status. The stop flag
//! is checked once per iteration, so stopping can take up to one full
//! iteration (detector latency dominates). A stalled detector stalls the loop;
//! no timeout is applied to it here.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::watch;

use crate::algorithm::aim_controller::AimController;
use crate::algorithm::geometry::{CaptureRect, ScreenGeometry};
use crate::algorithm::lock_engine::{LockEngine, LockEvent};
use crate::algorithm::render_payload::{build_payload, RenderContext};
use crate::capture::frame_source::FrameSource;
use crate::detection::{Detector, InferenceParams};
use crate::error::{AimError, Result};
use crate::models::config::RunConfig;
use crate::models::payload::{DrawingPayload, SessionStatus};
use crate::output::actuator::PointerActuator;
use crate::output::render_sink::RenderSink;
use crate::telemetry::hotkey::{ActiveFlag, HotkeySource};

const FRAME_LOG_INTERVAL: u64 = 300;

/// Frames per second from the wall-clock delta between two iterations.
pub fn fps_from_delta(delta_secs: f64) -> f64 {
    if delta_secs > 0.0 && delta_secs.is_finite() {
        1.0 / delta_secs
    } else {
        0.0
    }
}

/// Collaborators owned by the loop thread.
pub struct LoopDevices {
    pub frame_source: Box<dyn FrameSource>,
    pub detector: Box<dyn Detector>,
    pub actuator: Box<dyn PointerActuator>,
    pub render_sink: Box<dyn RenderSink>,
    pub hotkey: Box<dyn HotkeySource>,
}

pub struct AimWorker {
    session_id: String,
    params: InferenceParams,
    capture: CaptureRect,
    lock: LockEngine,
    aim: AimController,
    render: RenderContext,
    devices: LoopDevices,
    active: ActiveFlag,
    stop_flag: Arc<AtomicBool>,
    status_tx: watch::Sender<SessionStatus>,
    frames: u64,
    fps: f64,
}

impl AimWorker {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        session_id: String,
        config: &RunConfig,
        screen: &ScreenGeometry,
        capture: CaptureRect,
        devices: LoopDevices,
        active: ActiveFlag,
        stop_flag: Arc<AtomicBool>,
        status_tx: watch::Sender<SessionStatus>,
    ) -> Self {
        Self {
            session_id,
            params: config.inference_params(),
            capture,
            lock: LockEngine::new(config.iou_track_threshold, capture, screen),
            aim: AimController::from_config(config),
            render: RenderContext::new(config, screen),
            devices,
            active,
            stop_flag,
            status_tx,
            frames: 0,
            fps: 0.0,
        }
    }

    /// Runs until the stop flag is observed or a capture/detector fault occurs.
    /// Cleanup runs either way.
    pub fn run(mut self) -> Result<()> {
        log::info!(
            "worker[{}]: started, capture={:?} detector={}",
            self.session_id,
            self.capture,
            self.devices.detector.name()
        );

        let result = self.run_loop();
        if let Err(err) = &result {
            log::error!("worker[{}]: loop failed: {err}", self.session_id);
        }

        self.cleanup();
        result
    }

    fn run_loop(&mut self) -> Result<()> {
        let mut last_tick: Option<Instant> = None;

        while !self.stop_flag.load(Ordering::Acquire) {
            let active = self.active.get();
            if self.lock.set_active(active) {
                log::info!("worker[{}]: active={active}", self.session_id);
                if !active {
                    self.devices.render_sink.push(DrawingPayload::cleared());
                }
            }

            let frame = self
                .devices
                .frame_source
                .capture()
                .map_err(AimError::Capture)?;
            let observations = self
                .devices
                .detector
                .infer(&frame, &self.params)
                .map_err(AimError::Detector)?;

            let event = self.lock.step(&observations);
            self.log_lock_event(&event);

            if active {
                if let Some(locked_box) = self.lock.state().locked_box {
                    if let Some((dx, dy)) = self.aim.displacement(&locked_box, self.capture.center())
                    {
                        if let Err(err) = self.devices.actuator.move_relative(dx, dy) {
                            log::warn!("worker[{}]: move_relative failed: {err}", self.session_id);
                        }
                    }
                }
            }

            let now = Instant::now();
            self.fps = last_tick
                .map(|prev| fps_from_delta(now.duration_since(prev).as_secs_f64()))
                .unwrap_or(0.0);
            last_tick = Some(now);

            let payload = build_payload(
                &observations,
                self.lock.state(),
                self.fps,
                active,
                &self.render,
            );
            self.devices.render_sink.push(payload);

            self.frames = self.frames.saturating_add(1);
            self.publish_status(true);
            if self.frames % FRAME_LOG_INTERVAL == 0 {
                log::info!(
                    "worker[{}]: {} frames, fps={:.1}",
                    self.session_id,
                    self.frames,
                    self.fps
                );
            }
        }

        Ok(())
    }

    fn log_lock_event(&self, event: &LockEvent) {
        match event {
            LockEvent::Acquired { .. } => log::debug!(
                "worker[{}]: lock acquired id={:?}",
                self.session_id,
                self.lock.state().locked_id
            ),
            LockEvent::Reidentified { iou, .. } => log::debug!(
                "worker[{}]: lock re-identified id={:?} iou={iou:.2}",
                self.session_id,
                self.lock.state().locked_id
            ),
            LockEvent::Lost { best_iou } => log::debug!(
                "worker[{}]: lock lost, best iou={best_iou:.2}",
                self.session_id
            ),
            _ => {}
        }
    }

    fn publish_status(&self, running: bool) {
        self.status_tx.send_replace(SessionStatus {
            session_id: self.session_id.clone(),
            fps: self.fps,
            active: self.lock.state().active,
            locked: self.lock.state().is_locked(),
            frames: self.frames,
            updated_at_ms: chrono::Utc::now().timestamp_millis(),
            running,
        });
    }

    fn cleanup(&mut self) {
        log::info!("worker[{}]: cleaning up", self.session_id);
        self.lock.reset();
        self.devices.render_sink.push(DrawingPayload::cleared());
        self.devices.detector.release();
        self.devices.frame_source.close();
        self.devices.hotkey.unbind();
        self.publish_status(false);
        log::info!(
            "worker[{}]: stopped after {} frames",
            self.session_id,
            self.frames
        );
    }
}
