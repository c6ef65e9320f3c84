pub mod algorithm;
pub mod capture;
pub mod commands;
pub mod detection;
pub mod error;
pub mod models;
pub mod output;
pub mod telemetry;

pub use commands::session::{start, stop, SessionHandle, ShutdownOutcome};
pub use error::{AimError, Result};
pub use models::config::{RunConfig, Settings};

/// Installs the env_logger backend, defaulting to `info`. Safe to call more than once.
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();
}
