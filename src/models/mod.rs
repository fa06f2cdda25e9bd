//! Data models

pub mod attack_event;
pub mod request_log;

pub use attack_event::*;
pub use request_log::*;
