//! Frame source contract.

use std::sync::Arc;

use crate::algorithm::geometry::CaptureRect;

/// One captured BGRA frame of the capture rect, top-to-bottom rows.
#[derive(Clone, Debug)]
pub struct RawFrame {
    pub width: u32,
    pub height: u32,
    pub pixels: Arc<[u8]>,
    /// Monotonic per-source frame counter.
    pub sequence: u64,
}

impl RawFrame {
    pub fn new(width: u32, height: u32, pixels: Arc<[u8]>, sequence: u64) -> Self {
        Self {
            width,
            height,
            pixels,
            sequence,
        }
    }

    /// Zero-filled frame of the given size.
    pub fn blank(width: u32, height: u32, sequence: u64) -> Self {
        let len = width as usize * height as usize * 4;
        Self::new(width, height, Arc::from(vec![0u8; len]), sequence)
    }
}

/// Yields one frame of a fixed capture rect per call.
pub trait FrameSource: Send {
    /// False when the capture device cannot deliver frames; checked once at start.
    fn is_ready(&self) -> bool;

    /// Physical size of the captured monitor.
    fn screen_size(&self) -> (u32, u32);

    /// Fixes the region to capture, in physical-screen pixels. Called once at start.
    fn open(&mut self, rect: CaptureRect) -> Result<(), String>;

    /// Blocks until the next frame is available. An error is fatal to the loop.
    fn capture(&mut self) -> Result<RawFrame, String>;

    /// Releases the capture handle. Called once during cleanup.
    fn close(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_frame_has_bgra_length() {
        let frame = RawFrame::blank(4, 3, 9);
        assert_eq!(frame.pixels.len(), 48);
        assert_eq!(frame.sequence, 9);
        assert!(frame.pixels.iter().all(|b| *b == 0));
    }
}
