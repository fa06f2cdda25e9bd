//! Classification rules
//!
//! Marker lists and the ordered rule table. `RULES` is evaluated top to
//! bottom and the first rule whose predicate holds decides the verdict.

use super::types::{AttackType, Classification};
use crate::models::Severity;

// ============================================================================
// MARKERS (all lower-case; inputs are lower-cased before matching)
// ============================================================================

pub const UPLOAD_PATH_MARKERS: &[&str] = &["upload", "exec", "shell", "cmd"];

/// Script tags, shell invocations, server-side script openers
pub const MALICIOUS_CODE_MARKERS: &[&str] = &[
    "<script",
    "/bin/sh",
    "/bin/bash",
    "cmd.exe",
    "powershell",
    "<?php",
    "<%",
];

pub const FINANCIAL_PATH_MARKERS: &[&str] = &["billing", "payment", "invoice"];

pub const ADMIN_PATH_MARKERS: &[&str] = &["admin", "config", "logs"];

/// Boolean tautologies, comment terminator, script tag
pub const INJECTION_BODY_MARKERS: &[&str] = &["' or '1'='1", "' or 1=1", " or 1=1", "--", "<script"];

pub const SESSION_PATH_MARKERS: &[&str] = &["login", "register", "auth"];

pub const SCRIPT_TAG: &str = "<script";

// ============================================================================
// RULE TABLE
// ============================================================================

/// Lower-cased view of the request the predicates run against
#[derive(Debug, Clone, Copy)]
pub struct RuleInput<'a> {
    pub path: &'a str,
    pub body: &'a str,
}

pub struct ClassificationRule {
    pub name: &'static str,
    pub applies: fn(&RuleInput<'_>) -> bool,
    pub verdict: fn(&RuleInput<'_>) -> Classification,
}

pub static RULES: [ClassificationRule; 5] = [
    ClassificationRule {
        name: "code_execution",
        applies: path_has_upload_marker,
        verdict: code_execution_verdict,
    },
    ClassificationRule {
        name: "financial_recon",
        applies: path_is_financial,
        verdict: financial_verdict,
    },
    ClassificationRule {
        name: "administrative_recon",
        applies: path_is_administrative,
        verdict: administrative_verdict,
    },
    ClassificationRule {
        name: "injection",
        applies: body_has_injection_marker,
        verdict: injection_verdict,
    },
    ClassificationRule {
        name: "session_start",
        applies: path_is_session,
        verdict: session_verdict,
    },
];

pub fn contains_any(haystack: &str, markers: &[&str]) -> bool {
    !haystack.is_empty() && markers.iter().any(|marker| haystack.contains(marker))
}

// Predicates

fn path_has_upload_marker(input: &RuleInput<'_>) -> bool {
    contains_any(input.path, UPLOAD_PATH_MARKERS)
}

fn path_is_financial(input: &RuleInput<'_>) -> bool {
    contains_any(input.path, FINANCIAL_PATH_MARKERS)
}

fn path_is_administrative(input: &RuleInput<'_>) -> bool {
    contains_any(input.path, ADMIN_PATH_MARKERS)
}

fn body_has_injection_marker(input: &RuleInput<'_>) -> bool {
    contains_any(input.body, INJECTION_BODY_MARKERS)
}

fn path_is_session(input: &RuleInput<'_>) -> bool {
    contains_any(input.path, SESSION_PATH_MARKERS)
}

// Verdicts

fn code_execution_verdict(input: &RuleInput<'_>) -> Classification {
    let analysis = if contains_any(input.body, MALICIOUS_CODE_MARKERS) {
        "Confirmed Malicious Code"
    } else {
        "File Upload Attempt (High Risk)"
    };
    Classification::new(AttackType::CodeExecution, Severity::Critical, analysis)
}

fn financial_verdict(_: &RuleInput<'_>) -> Classification {
    Classification::new(AttackType::FinancialRecon, Severity::High, "Billing Data Enumeration")
}

fn administrative_verdict(_: &RuleInput<'_>) -> Classification {
    Classification::new(AttackType::AdministrativeRecon, Severity::Medium, "Privileged Endpoint Probe")
}

fn injection_verdict(input: &RuleInput<'_>) -> Classification {
    let analysis = if input.body.contains(SCRIPT_TAG) {
        "XSS Payload Detected"
    } else {
        "SQL Syntax Detected"
    };
    Classification::new(AttackType::Injection, Severity::High, analysis)
}

fn session_verdict(_: &RuleInput<'_>) -> Classification {
    Classification::new(AttackType::BruteForce, Severity::Medium, "Credential Submission")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_order_is_fixed() {
        let names: Vec<_> = RULES.iter().map(|r| r.name).collect();
        assert_eq!(
            names,
            ["code_execution", "financial_recon", "administrative_recon", "injection", "session_start"]
        );
    }

    #[test]
    fn test_empty_haystack_never_matches() {
        assert!(!contains_any("", INJECTION_BODY_MARKERS));
        assert!(!contains_any("", &[""]));
    }

    #[test]
    fn test_markers_are_lowercase() {
        let all = [
            UPLOAD_PATH_MARKERS,
            MALICIOUS_CODE_MARKERS,
            FINANCIAL_PATH_MARKERS,
            ADMIN_PATH_MARKERS,
            INJECTION_BODY_MARKERS,
            SESSION_PATH_MARKERS,
        ];
        for list in all {
            for marker in list {
                assert_eq!(*marker, marker.to_lowercase());
            }
        }
    }
}
