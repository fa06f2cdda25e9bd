//! API Handlers

pub mod health;
pub mod gateway;
pub mod decoy;
