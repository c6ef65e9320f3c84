//! Builds the overlay payload for one frame.

use crate::algorithm::geometry::{box_to_logical_rect, scope_rect, ScreenGeometry};
use crate::algorithm::lock_engine::LockState;
use crate::models::config::RunConfig;
use crate::models::observation::TargetObservation;
use crate::models::payload::{DrawingPayload, LogicalRect, Rgb, TargetItem};

pub const LOCKED_COLOR: Rgb = Rgb::RED;
pub const TRACKED_COLOR: Rgb = Rgb::GREEN;
pub const ACTIVE_STATUS_COLOR: Rgb = Rgb::RED;
pub const PAUSED_STATUS_COLOR: Rgb = Rgb::GREEN;

/// Frame-independent drawing inputs, fixed at loop start.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderContext {
    pub scope_rect: LogicalRect,
    pub scaling_factor: f64,
    pub enable_draw: bool,
    pub show_scope: bool,
}

impl RenderContext {
    pub fn new(config: &RunConfig, screen: &ScreenGeometry) -> Self {
        Self {
            scope_rect: scope_rect(screen, config.range_width, config.range_height),
            scaling_factor: config.scaling_factor,
            enable_draw: config.enable_draw,
            show_scope: config.show_scope,
        }
    }
}

pub fn status_text(active: bool, fps: f64) -> String {
    let fps = if fps.is_finite() { fps.round().max(0.0) as u32 } else { 0 };
    if active {
        format!("ACTIVE FPS: {fps}")
    } else {
        format!("PAUSED FPS: {fps}")
    }
}

fn is_locked(observation: &TargetObservation, lock: &LockState) -> bool {
    match lock.locked_id {
        Some(id) => observation.id == Some(id),
        None => lock.locked_box == Some(observation.bbox),
    }
}

pub fn build_payload(
    observations: &[TargetObservation],
    lock: &LockState,
    fps: f64,
    active: bool,
    ctx: &RenderContext,
) -> DrawingPayload {
    let target_items = if ctx.enable_draw {
        observations
            .iter()
            .map(|observation| TargetItem {
                rect: box_to_logical_rect(&observation.bbox, &ctx.scope_rect, ctx.scaling_factor),
                color: if is_locked(observation, lock) {
                    LOCKED_COLOR
                } else {
                    TRACKED_COLOR
                },
            })
            .collect()
    } else {
        Vec::new()
    };

    DrawingPayload {
        scope_rect: ctx.scope_rect,
        target_items,
        status_text: status_text(active, fps),
        status_color: if active {
            ACTIVE_STATUS_COLOR
        } else {
            PAUSED_STATUS_COLOR
        },
        show_scope: ctx.show_scope,
    }
}
