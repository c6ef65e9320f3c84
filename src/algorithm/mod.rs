pub mod aim_controller;
pub mod geometry;
pub mod lock_engine;
pub mod render_payload;
