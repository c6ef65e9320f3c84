//! Relative pointer moves through `SendInput`.
//!
//! Relative `MOUSEEVENTF_MOVE` deltas go through the system pointer ballistics;
//! with "Enhance pointer precision" on, the on-screen distance is not 1:1.

use windows::Win32::UI::Input::KeyboardAndMouse::{
    SendInput, INPUT, INPUT_0, INPUT_MOUSE, MOUSEEVENTF_MOVE, MOUSEINPUT,
};

use crate::output::actuator::PointerActuator;

#[derive(Debug, Default)]
pub struct SendInputActuator;

impl SendInputActuator {
    pub fn new() -> Self {
        Self
    }
}

impl PointerActuator for SendInputActuator {
    fn is_ready(&self) -> bool {
        true
    }

    fn move_relative(&mut self, dx: i32, dy: i32) -> Result<(), String> {
        if dx == 0 && dy == 0 {
            return Ok(());
        }

        let input = INPUT {
            r#type: INPUT_MOUSE,
            Anonymous: INPUT_0 {
                mi: MOUSEINPUT {
                    dx,
                    dy,
                    dwFlags: MOUSEEVENTF_MOVE,
                    ..Default::default()
                },
            },
        };

        let sent = unsafe { SendInput(&[input], std::mem::size_of::<INPUT>() as i32) };
        if sent != 1 {
            return Err(format!("SendInput rejected relative move ({dx}, {dy})"));
        }
        Ok(())
    }
}
