//! Decoy Module
//!
//! The fake API the relay diverts suspicious traffic to. Every hit is
//! classified and reported back through the telemetry header while the caller
//! receives a believable fabricated response.
//!
//! ## Structure
//! - `routes`: static (method, path) -> trap table and its router
//! - `forensics`: per-request attack event assembly
//! - `throttle`: fake latency and the fake login limiter
//! - `payloads`: fabricated response bodies
//! - `schema`: permissive request body validation
//! - `tokens`: fake JWT issuance

pub mod routes;
pub mod forensics;
pub mod throttle;
pub mod payloads;
pub mod schema;
pub mod tokens;

use std::sync::Arc;

pub use forensics::{Capture, Forensics};
pub use routes::{api_router, Trap};
pub use throttle::{fake_delay, FakeLatency, LoginThrottle};
pub use tokens::FakeTokenIssuer;

/// Shared decoy state
#[derive(Clone)]
pub struct DecoyState {
    pub forensics: Arc<Forensics>,
    pub throttle: Arc<LoginThrottle>,
    pub tokens: Arc<FakeTokenIssuer>,
}
