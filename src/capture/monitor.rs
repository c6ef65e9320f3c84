//! Monitor size and DPI scale lookup.

#[cfg(target_os = "windows")]
use windows::Win32::Graphics::Gdi::HMONITOR;
#[cfg(target_os = "windows")]
use windows::Win32::UI::HiDpi::{GetDpiForMonitor, MDT_EFFECTIVE_DPI};
#[cfg(target_os = "windows")]
use windows_capture::monitor::Monitor;

/// Clamp applied to any reported scale.
pub const MIN_SCALE_FACTOR: f64 = 0.5;
pub const MAX_SCALE_FACTOR: f64 = 4.0;

/// Effective DPI -> scale factor (96 DPI = 1.0).
pub fn scale_from_dpi(dpi: u32) -> f64 {
    if dpi == 0 {
        return 1.0;
    }
    (dpi as f64 / 96.0).clamp(MIN_SCALE_FACTOR, MAX_SCALE_FACTOR)
}

#[cfg(target_os = "windows")]
pub(crate) fn monitor_by_index(monitor_index: u32) -> Result<Monitor, String> {
    Monitor::enumerate()
        .map_err(|e| format!("Failed to enumerate monitors: {e}"))?
        .into_iter()
        .nth(monitor_index as usize)
        .ok_or_else(|| format!("Monitor index {monitor_index} not found"))
}

#[cfg(target_os = "windows")]
fn effective_dpi(monitor: &Monitor) -> Result<u32, String> {
    let (mut dpi_x, mut dpi_y) = (0u32, 0u32);
    // SAFETY: the handle comes from a live monitor enumeration.
    let queried = unsafe {
        GetDpiForMonitor(
            HMONITOR(monitor.as_raw_hmonitor() as isize),
            MDT_EFFECTIVE_DPI,
            &mut dpi_x,
            &mut dpi_y,
        )
    };
    queried.map_err(|e| format!("Failed to get monitor DPI: {e}"))?;
    Ok(dpi_x)
}

/// Physical size of a monitor (0 = primary).
#[cfg(target_os = "windows")]
pub fn get_monitor_size(monitor_index: u32) -> Result<(u32, u32), String> {
    let monitor = monitor_by_index(monitor_index)?;
    let size = monitor
        .width()
        .and_then(|width| Ok((width, monitor.height()?)))
        .map_err(|e| format!("Failed to get monitor {monitor_index} size: {e}"))?;
    Ok(size)
}

#[cfg(not(target_os = "windows"))]
pub fn get_monitor_size(monitor_index: u32) -> Result<(u32, u32), String> {
    Err(format!(
        "Monitor {monitor_index}: screen capture is only supported on Windows"
    ))
}

/// Scale factor of a monitor (1.0 = 100%, 1.25 = 125%).
#[cfg(target_os = "windows")]
pub fn get_monitor_scale_factor(monitor_index: u32) -> Result<f64, String> {
    let monitor = monitor_by_index(monitor_index)?;
    effective_dpi(&monitor).map(scale_from_dpi)
}

#[cfg(not(target_os = "windows"))]
pub fn get_monitor_scale_factor(_monitor_index: u32) -> Result<f64, String> {
    Ok(1.0)
}
