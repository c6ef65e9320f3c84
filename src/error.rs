//! Error taxonomy for the aim loop.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, AimError>;

#[derive(Error, Debug)]
pub enum AimError {
    /// Missing, non-numeric or out-of-range setting. Rejected before the loop starts.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Frame source or actuator not ready at start.
    #[error("Device not ready: {0}")]
    Device(String),

    /// Frame source failed while the loop was running.
    #[error("Capture failed: {0}")]
    Capture(String),

    /// Detector call failed while the loop was running.
    #[error("Detector failed: {0}")]
    Detector(String),

    #[error("Worker error: {0}")]
    Worker(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AimError {
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    pub fn device<S: Into<String>>(msg: S) -> Self {
        Self::Device(msg.into())
    }

    pub fn capture<S: Into<String>>(msg: S) -> Self {
        Self::Capture(msg.into())
    }

    pub fn detector<S: Into<String>>(msg: S) -> Self {
        Self::Detector(msg.into())
    }

    /// True for the faults that end a running loop (as opposed to start-time rejections).
    pub fn is_runtime_fault(&self) -> bool {
        matches!(self, Self::Capture(_) | Self::Detector(_))
    }
}
