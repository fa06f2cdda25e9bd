//! Gateway request log model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

/// One request seen by the gateway, diverted or not
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestLog {
    pub ip: String,
    pub method: String,
    pub url: String,
    pub user_agent: Option<String>,
    /// Screening reason when the request was flagged
    pub detected_reason: Option<String>,
    /// Query parameters for bodiless methods, otherwise the body
    pub payload: Option<serde_json::Value>,
    pub timestamp: DateTime<Utc>,
}

impl RequestLog {
    pub async fn insert(&self, pool: &PgPool) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO request_logs (ip, method, url, user_agent, detected_attack_type, payload, timestamp)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#
        )
        .bind(&self.ip)
        .bind(&self.method)
        .bind(&self.url)
        .bind(&self.user_agent)
        .bind(&self.detected_reason)
        .bind(&self.payload)
        .bind(self.timestamp)
        .execute(pool)
        .await?;
        Ok(())
    }
}
