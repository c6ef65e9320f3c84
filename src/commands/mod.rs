#[cfg(target_os = "windows")]
pub mod desktop;
pub mod session;
