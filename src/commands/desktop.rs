//! Session wired to the real desktop: WGC capture, SendInput, global hotkey.

use crate::capture::monitor::get_monitor_scale_factor;
use crate::capture::screen::ScreenFrameSource;
use crate::commands::session::{self, SessionHandle};
use crate::detection::Detector;
use crate::error::Result;
use crate::models::config::{RunConfig, Settings};
use crate::output::render_sink::RenderSink;
use crate::output::send_input::SendInputActuator;
use crate::telemetry::hook::GlobalHotkeyHook;

/// Resolves the monitor's DPI scale, builds the run config and starts the loop.
pub fn start_desktop_session(
    settings: &Settings,
    monitor_index: u32,
    detector: Box<dyn Detector>,
    render_sink: Box<dyn RenderSink>,
) -> Result<SessionHandle> {
    let scaling_factor = get_monitor_scale_factor(monitor_index).unwrap_or_else(|err| {
        log::warn!("start_desktop_session: failed to resolve monitor scale factor: {err}");
        1.0
    });
    let config = RunConfig::from_settings(settings, scaling_factor)?;

    session::start(
        config,
        detector,
        Box::new(ScreenFrameSource::new(monitor_index)),
        Box::new(SendInputActuator::new()),
        render_sink,
        Box::new(GlobalHotkeyHook::new()),
    )
}
