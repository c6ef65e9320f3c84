pub mod frame_source;
pub mod monitor;
#[cfg(target_os = "windows")]
pub mod screen;
pub mod worker;
