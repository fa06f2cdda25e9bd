//! Request classifier
//!
//! Pure and total: every request gets a verdict, the fallback being
//! low-severity reconnaissance.

use axum::http::Method;

use super::rules::{RuleInput, RULES};
use super::types::Classification;

// ============================================================================
// MAIN CLASSIFICATION FUNCTION
// ============================================================================

/// Classify a request from its path and full serialized body.
///
/// Matching is case-insensitive substring search; rules are tried in
/// priority order and the first hit wins.
pub fn classify(path: &str, body: &str, _method: &Method) -> Classification {
    let path = path.to_lowercase();
    let body = body.to_lowercase();
    let input = RuleInput { path: &path, body: &body };

    RULES
        .iter()
        .find(|rule| (rule.applies)(&input))
        .map(|rule| (rule.verdict)(&input))
        .unwrap_or_default()
}

// ============================================================================
// TESTS
// ============================================================================
