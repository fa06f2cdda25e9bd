//! Outbound relay to the decoy and the real upstream

pub mod forward;

pub use forward::{fallback_response, Relay};
