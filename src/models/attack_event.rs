//! Attack event model

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::error::TelemetryError;

pub const NO_SESSION: &str = "N/A";
pub const UNKNOWN_LOCATION: &str = "Unknown";

// ============================================================================
// SEVERITY
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "LOW",
            Severity::Medium => "MEDIUM",
            Severity::High => "HIGH",
            Severity::Critical => "CRITICAL",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// ATTACK EVENT
// ============================================================================

/// One classified request handled by the decoy.
///
/// Built once by the forensic extractor, carried back to the relay in the
/// telemetry header, then handed to the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttackEvent {
    #[serde(default = "no_session")]
    pub session_id: String,
    pub attack_type: String,
    pub severity: Severity,
    pub payload_analysis: String,
    pub ip_address: String,
    #[serde(default = "unknown_location")]
    pub location: String,
    pub user_agent: String,
    pub target_url: String,
    pub http_method: String,
    pub latency_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
    pub headers: BTreeMap<String, String>,
    pub timestamp: DateTime<Utc>,
}

fn no_session() -> String {
    NO_SESSION.to_string()
}

fn unknown_location() -> String {
    UNKNOWN_LOCATION.to_string()
}

impl AttackEvent {
    /// Reject records whose required identifying fields are blank
    pub fn validate(&self) -> Result<(), TelemetryError> {
        let required = [
            ("attackType", &self.attack_type),
            ("ipAddress", &self.ip_address),
            ("targetUrl", &self.target_url),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(TelemetryError::MissingField(name));
            }
        }
        Ok(())
    }

    pub async fn insert(&self, pool: &PgPool) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO attack_logs (
                session_id, attack_type, severity, payload_analysis,
                ip_address, location, user_agent, latency_ms,
                target_url, http_method, full_payload, full_headers, timestamp
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#
        )
        .bind(&self.session_id)
        .bind(&self.attack_type)
        .bind(self.severity.as_str())
        .bind(&self.payload_analysis)
        .bind(&self.ip_address)
        .bind(&self.location)
        .bind(&self.user_agent)
        .bind(i64::try_from(self.latency_ms).unwrap_or(i64::MAX))
        .bind(&self.target_url)
        .bind(&self.http_method)
        .bind(&self.payload)
        .bind(sqlx::types::Json(&self.headers))
        .bind(self.timestamp)
        .execute(pool)
        .await?;
        Ok(())
    }
}
