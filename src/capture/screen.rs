//! Frame source backed by Windows Graphics Capture.
//!
//! WGC pushes frames from its own thread; the handler crops each one to the
//! capture rect and parks it in a latest-frame slot. `capture()` pulls from
//! the slot, waiting for a frame newer than the one it returned last. WGC
//! only emits frames when the screen changes, so a wait that times out
//! hands back the previous frame again.

use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use windows_capture::{
    capture::{CaptureControl, Context, GraphicsCaptureApiHandler},
    frame::Frame,
    graphics_capture_api::InternalCaptureControl,
    settings::{
        ColorFormat, CursorCaptureSettings, DirtyRegionSettings, DrawBorderSettings,
        MinimumUpdateIntervalSettings, SecondaryWindowSettings, Settings,
    },
};

use crate::algorithm::geometry::CaptureRect;
use crate::capture::frame_source::{FrameSource, RawFrame};
use crate::capture::monitor::{get_monitor_size, monitor_by_index};

const FRAME_WAIT: Duration = Duration::from_millis(50);
const FIRST_FRAME_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Default)]
struct FrameSlot {
    latest: Option<RawFrame>,
    next_sequence: u64,
    closed: bool,
}

type SharedSlot = Arc<(Mutex<FrameSlot>, Condvar)>;

struct CropFlags {
    slot: SharedSlot,
    rect: CaptureRect,
}

struct CropCaptureHandler {
    slot: SharedSlot,
    rect: CaptureRect,
}

type CropCaptureControl = CaptureControl<CropCaptureHandler, String>;

impl GraphicsCaptureApiHandler for CropCaptureHandler {
    type Flags = CropFlags;
    type Error = String;

    fn new(ctx: Context<Self::Flags>) -> Result<Self, Self::Error> {
        Ok(Self {
            slot: ctx.flags.slot,
            rect: ctx.flags.rect,
        })
    }

    fn on_frame_arrived(
        &mut self,
        frame: &mut Frame<'_>,
        _control: InternalCaptureControl,
    ) -> Result<(), Self::Error> {
        let left = self.rect.left.max(0) as u32;
        let top = self.rect.top.max(0) as u32;
        let right = (left + self.rect.width).min(frame.width());
        let bottom = (top + self.rect.height).min(frame.height());
        if right <= left || bottom <= top {
            return Err(format!(
                "Capture rect {:?} lies outside the {}x{} frame",
                self.rect,
                frame.width(),
                frame.height()
            ));
        }

        let mut cropped = frame
            .buffer_crop(left, top, right, bottom)
            .map_err(|err| format!("Failed to crop frame: {err}"))?;
        let bytes = cropped
            .as_nopadding_buffer()
            .map_err(|err| format!("Failed to read frame bytes: {err}"))?;
        let pixels: Arc<[u8]> = Arc::from(bytes);

        let (lock, cvar) = &*self.slot;
        {
            let mut slot = lock
                .lock()
                .map_err(|_| "Frame slot lock poisoned".to_string())?;
            slot.next_sequence = slot.next_sequence.saturating_add(1);
            slot.latest = Some(RawFrame::new(
                right - left,
                bottom - top,
                pixels,
                slot.next_sequence,
            ));
        }
        cvar.notify_all();

        Ok(())
    }

    fn on_closed(&mut self) -> Result<(), Self::Error> {
        let (lock, cvar) = &*self.slot;
        if let Ok(mut slot) = lock.lock() {
            slot.closed = true;
        }
        cvar.notify_all();
        log::info!("screen capture closed");
        Ok(())
    }
}

/// Captures a fixed rect of one monitor.
pub struct ScreenFrameSource {
    monitor_index: u32,
    screen_size: Option<(u32, u32)>,
    slot: SharedSlot,
    control: Option<CropCaptureControl>,
    last_sequence: u64,
}

impl ScreenFrameSource {
    pub fn new(monitor_index: u32) -> Self {
        let screen_size = match get_monitor_size(monitor_index) {
            Ok(size) => Some(size),
            Err(err) => {
                log::warn!("ScreenFrameSource: {err}");
                None
            }
        };

        Self {
            monitor_index,
            screen_size,
            slot: Arc::new((Mutex::new(FrameSlot::default()), Condvar::new())),
            control: None,
            last_sequence: 0,
        }
    }
}

impl FrameSource for ScreenFrameSource {
    fn is_ready(&self) -> bool {
        self.screen_size.is_some()
    }

    fn screen_size(&self) -> (u32, u32) {
        self.screen_size.unwrap_or((0, 0))
    }

    fn open(&mut self, rect: CaptureRect) -> Result<(), String> {
        let monitor = monitor_by_index(self.monitor_index)?;
        let flags = CropFlags {
            slot: self.slot.clone(),
            rect,
        };

        let settings = Settings::new(
            monitor,
            CursorCaptureSettings::WithoutCursor,
            DrawBorderSettings::WithoutBorder,
            SecondaryWindowSettings::Default,
            MinimumUpdateIntervalSettings::Default,
            DirtyRegionSettings::Default,
            ColorFormat::Bgra8,
            flags,
        );

        let control = CropCaptureHandler::start_free_threaded(settings)
            .map_err(|err| format!("Failed to start screen capture: {err}"))?;
        self.control = Some(control);
        log::info!(
            "ScreenFrameSource: monitor={} rect={rect:?}",
            self.monitor_index
        );
        Ok(())
    }

    fn capture(&mut self) -> Result<RawFrame, String> {
        let (lock, cvar) = &*self.slot;
        let mut guard = lock
            .lock()
            .map_err(|_| "Frame slot lock poisoned".to_string())?;
        let mut waited = Duration::ZERO;

        loop {
            if guard.closed {
                return Err("Screen capture session closed".to_string());
            }

            if let Some(frame) = guard.latest.as_ref() {
                if frame.sequence != self.last_sequence || waited >= FRAME_WAIT {
                    self.last_sequence = frame.sequence;
                    return Ok(frame.clone());
                }
            } else if waited >= FIRST_FRAME_TIMEOUT {
                return Err(format!(
                    "No frame delivered within {}ms",
                    FIRST_FRAME_TIMEOUT.as_millis()
                ));
            }

            let (next_guard, _) = cvar
                .wait_timeout(guard, FRAME_WAIT)
                .map_err(|_| "Frame slot wait poisoned".to_string())?;
            guard = next_guard;
            waited += FRAME_WAIT;
        }
    }

    fn close(&mut self) {
        let Some(control) = self.control.take() else {
            return;
        };

        if let Err(err) = control.stop() {
            log::warn!("screen capture stop failed: {err}");
        }
    }
}

impl Drop for ScreenFrameSource {
    fn drop(&mut self) {
        self.close();
    }
}
