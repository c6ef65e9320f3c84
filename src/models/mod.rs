pub mod config;
pub mod observation;
pub mod payload;
