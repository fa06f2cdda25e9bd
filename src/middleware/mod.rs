//! Request middleware and extractors

pub mod inbound;
