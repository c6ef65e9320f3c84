//! Session lifecycle: validate devices, spawn the loop thread, stop it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use tokio::sync::watch;

use crate::algorithm::geometry::{CaptureRect, ScreenGeometry};
use crate::capture::frame_source::FrameSource;
use crate::capture::worker::{AimWorker, LoopDevices};
use crate::detection::Detector;
use crate::error::{AimError, Result};
use crate::models::config::RunConfig;
use crate::models::payload::SessionStatus;
use crate::output::actuator::PointerActuator;
use crate::output::render_sink::RenderSink;
use crate::telemetry::hotkey::{ActiveFlag, HotkeySource};

/// How a bounded shutdown ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownOutcome {
    /// The loop thread exited and cleanup ran.
    Stopped,
    /// The thread did not exit in time and was left running detached.
    Abandoned,
}

/// Handle to a running session. Dropping it requests a stop without waiting.
pub struct SessionHandle {
    session_id: String,
    stop_flag: Arc<AtomicBool>,
    active: ActiveFlag,
    status_rx: watch::Receiver<SessionStatus>,
    worker: Option<JoinHandle<Result<()>>>,
}

impl SessionHandle {
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Requests the loop to exit after its current iteration. Idempotent.
    pub fn stop(&self) {
        if !self.stop_flag.swap(true, Ordering::AcqRel) {
            log::info!("session[{}]: stop requested", self.session_id);
        }
    }

    pub fn is_stop_requested(&self) -> bool {
        self.stop_flag.load(Ordering::Acquire)
    }

    pub fn is_finished(&self) -> bool {
        self.worker
            .as_ref()
            .map(|worker| worker.is_finished())
            .unwrap_or(true)
    }

    pub fn is_active(&self) -> bool {
        self.active.get()
    }

    /// Same effect as pressing the hotkey. Returns the new state.
    pub fn toggle_active(&self) -> bool {
        self.active.toggle()
    }

    pub fn set_active(&self, active: bool) {
        self.active.set(active);
    }

    /// Last status published by the loop.
    pub fn status(&self) -> SessionStatus {
        self.status_rx.borrow().clone()
    }

    pub fn status_receiver(&self) -> watch::Receiver<SessionStatus> {
        self.status_rx.clone()
    }

    /// Stops the session and blocks until the loop thread exits.
    /// Returns the error that ended the loop, if any.
    pub fn join(mut self) -> Result<()> {
        self.stop();
        match self.worker.take() {
            Some(worker) => join_worker(&self.session_id, worker),
            None => Ok(()),
        }
    }

    /// Stops the session and waits up to `timeout` for the loop thread.
    /// Past the deadline the thread is abandoned; it still exits and cleans up
    /// once its current iteration completes.
    pub async fn shutdown(mut self, timeout: Duration) -> Result<ShutdownOutcome> {
        self.stop();
        let Some(worker) = self.worker.take() else {
            return Ok(ShutdownOutcome::Stopped);
        };

        let session_id = self.session_id.clone();
        let join = tokio::task::spawn_blocking(move || join_worker(&session_id, worker));
        match tokio::time::timeout(timeout, join).await {
            Ok(Ok(result)) => result.map(|()| ShutdownOutcome::Stopped),
            Ok(Err(err)) => Err(AimError::Worker(format!("join task failed: {err}"))),
            Err(_) => {
                log::warn!(
                    "session[{}]: loop did not exit within {}ms, abandoning it",
                    self.session_id,
                    timeout.as_millis()
                );
                Ok(ShutdownOutcome::Abandoned)
            }
        }
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        self.stop_flag.store(true, Ordering::Release);
    }
}

fn join_worker(session_id: &str, worker: JoinHandle<Result<()>>) -> Result<()> {
    match worker.join() {
        Ok(result) => {
            log::info!("session[{session_id}]: loop thread exited");
            result
        }
        Err(_) => {
            log::error!("session[{session_id}]: loop thread panicked");
            Err(AimError::Worker("loop thread panicked".to_string()))
        }
    }
}

/// Validates the devices, fixes the capture rect and starts the loop thread.
///
/// Fails with `Device` when the frame source or actuator is not ready, and
/// with `Config` when the capture region does not fit on the screen. Nothing
/// keeps running on failure.
pub fn start(
    config: RunConfig,
    detector: Box<dyn Detector>,
    mut frame_source: Box<dyn FrameSource>,
    actuator: Box<dyn PointerActuator>,
    render_sink: Box<dyn RenderSink>,
    mut hotkey: Box<dyn HotkeySource>,
) -> Result<SessionHandle> {
    config.validate()?;

    if !frame_source.is_ready() {
        return Err(AimError::device("frame source is not ready"));
    }
    if !actuator.is_ready() {
        return Err(AimError::device("pointer actuator is not ready"));
    }

    let (screen_width, screen_height) = frame_source.screen_size();
    if screen_width == 0 || screen_height == 0 {
        return Err(AimError::device(format!(
            "frame source reported an empty screen ({screen_width}x{screen_height})"
        )));
    }
    let screen = ScreenGeometry::new(screen_width, screen_height, config.scaling_factor);

    let (capture_width, capture_height) = config.physical_capture_size();
    if capture_width > screen_width || capture_height > screen_height {
        return Err(AimError::config(format!(
            "capture region {capture_width}x{capture_height} exceeds screen {screen_width}x{screen_height}"
        )));
    }
    let capture = CaptureRect::centered(&screen, capture_width, capture_height);

    frame_source
        .open(capture)
        .map_err(|e| AimError::device(format!("failed to open frame source: {e}")))?;

    let active = ActiveFlag::new(false);
    if let Err(err) = hotkey.bind(&config.hotkey, active.clone()) {
        frame_source.close();
        return Err(AimError::device(format!(
            "failed to bind hotkey '{}': {err}",
            config.hotkey
        )));
    }

    let session_id = uuid::Uuid::new_v4().to_string();
    let stop_flag = Arc::new(AtomicBool::new(false));
    let (status_tx, status_rx) = watch::channel(SessionStatus {
        session_id: session_id.clone(),
        running: true,
        updated_at_ms: chrono::Utc::now().timestamp_millis(),
        ..SessionStatus::default()
    });

    log::info!(
        "start: session={session_id} screen={screen_width}x{screen_height} scale={} capture={capture:?} hotkey='{}'",
        config.scaling_factor,
        config.hotkey
    );

    let worker = AimWorker::new(
        session_id.clone(),
        &config,
        &screen,
        capture,
        LoopDevices {
            frame_source,
            detector,
            actuator,
            render_sink,
            hotkey,
        },
        active.clone(),
        stop_flag.clone(),
        status_tx,
    );

    let worker = std::thread::Builder::new()
        .name("scopelock-worker".to_string())
        .spawn(move || worker.run())
        .map_err(|e| AimError::Worker(format!("failed to spawn loop thread: {e}")))?;

    Ok(SessionHandle {
        session_id,
        stop_flag,
        active,
        status_rx,
        worker: Some(worker),
    })
}

/// Requests the session to stop; the loop exits within one iteration.
pub fn stop(handle: &SessionHandle) {
    handle.stop();
}
