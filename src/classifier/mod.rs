//! Classifier Module
//!
//! Decides what a request is. Nothing in here does I/O or keeps state.
//!
//! ## Structure
//! - `types`: `AttackType`, `Classification`
//! - `rules`: markers and the ordered rule table
//! - `engine`: `classify`, run by the decoy's forensic extractor
//! - `screen`: gateway pre-check deciding whether to divert at all
//!
//! ## Usage
//! ```ignore
//! use crate::classifier::classify;
//!
//! let verdict = classify("/api/auth/login", r#"{"username":"x' or 1=1"}"#, &Method::POST);
//! assert_eq!(verdict.attack_type.as_str(), "Injection Attempt");
//! ```

pub mod types;
pub mod rules;
pub mod engine;
pub mod screen;

pub use types::{AttackType, Classification};
pub use engine::classify;
pub use screen::{screen, ScreenReason};
