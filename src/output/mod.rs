pub mod actuator;
pub mod render_sink;
#[cfg(target_os = "windows")]
pub mod send_input;
