//! Pointer actuation contract.

/// Issues relative pointer moves in physical pixels.
pub trait PointerActuator: Send {
    /// False when the device cannot be driven; checked once at start.
    fn is_ready(&self) -> bool;

    /// One relative move. Never retried; the next frame's command supersedes it.
    fn move_relative(&mut self, dx: i32, dy: i32) -> Result<(), String>;
}

impl<A: PointerActuator + ?Sized> PointerActuator for Box<A> {
    fn is_ready(&self) -> bool {
        (**self).is_ready()
    }

    fn move_relative(&mut self, dx: i32, dy: i32) -> Result<(), String> {
        (**self).move_relative(dx, dy)
    }
}
