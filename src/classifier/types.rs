//! Classifier types
//!
//! Data only; the rule table lives in `rules`.

use crate::models::Severity;

// ============================================================================
// ATTACK TYPE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttackType {
    CodeExecution,
    FinancialRecon,
    AdministrativeRecon,
    Injection,
    BruteForce,
    Reconnaissance,
}

impl AttackType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttackType::CodeExecution => "Code Execution / File Upload",
            AttackType::FinancialRecon => "Financial Reconnaissance",
            AttackType::AdministrativeRecon => "Administrative Reconnaissance",
            AttackType::Injection => "Injection Attempt",
            AttackType::BruteForce => "Brute Force / Session Start",
            AttackType::Reconnaissance => "Reconnaissance",
        }
    }
}

impl std::fmt::Display for AttackType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// CLASSIFICATION
// ============================================================================

/// Verdict for one request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub attack_type: AttackType,
    pub severity: Severity,
    pub analysis: &'static str,
}

impl Classification {
    pub const fn new(attack_type: AttackType, severity: Severity, analysis: &'static str) -> Self {
        Self { attack_type, severity, analysis }
    }
}

impl Default for Classification {
    fn default() -> Self {
        Self::new(AttackType::Reconnaissance, Severity::Low, "N/A")
    }
}
