#[cfg(target_os = "windows")]
pub mod hook;
pub mod hotkey;
