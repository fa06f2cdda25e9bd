//! Database module - PostgreSQL connection and migrations

use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;

/// Create database connection pool
pub async fn create_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await
}

/// Run database migrations
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    // Multiple statements need the simple query protocol
    sqlx::raw_sql(SCHEMA_SQL)
        .execute(pool)
        .await?;

    tracing::info!("Forensic schema applied successfully");
    Ok(())
}

/// Database schema SQL
const SCHEMA_SQL: &str = r#"
-- Attack events relayed back from the decoy
CREATE TABLE IF NOT EXISTS attack_logs (
    id BIGSERIAL PRIMARY KEY,
    session_id VARCHAR(64) NOT NULL DEFAULT 'N/A',
    attack_type VARCHAR(100) NOT NULL,
    severity VARCHAR(16) NOT NULL,
    payload_analysis TEXT,
    ip_address VARCHAR(64) NOT NULL,
    location VARCHAR(255) NOT NULL DEFAULT 'Unknown',
    user_agent TEXT,
    latency_ms BIGINT,
    target_url TEXT NOT NULL,
    http_method VARCHAR(16),
    full_payload JSONB,
    full_headers JSONB,
    timestamp TIMESTAMPTZ NOT NULL,
    recorded_at TIMESTAMPTZ DEFAULT NOW()
);

-- Every request seen by the gateway
CREATE TABLE IF NOT EXISTS request_logs (
    id BIGSERIAL PRIMARY KEY,
    ip VARCHAR(64) NOT NULL,
    method VARCHAR(16) NOT NULL,
    url TEXT NOT NULL,
    user_agent TEXT,
    detected_attack_type VARCHAR(100),
    payload JSONB,
    timestamp TIMESTAMPTZ NOT NULL
);

-- Indexes
CREATE INDEX IF NOT EXISTS idx_attack_logs_session ON attack_logs(session_id);
CREATE INDEX IF NOT EXISTS idx_attack_logs_ip ON attack_logs(ip_address);
CREATE INDEX IF NOT EXISTS idx_attack_logs_severity ON attack_logs(severity);
CREATE INDEX IF NOT EXISTS idx_attack_logs_timestamp ON attack_logs(timestamp);
CREATE INDEX IF NOT EXISTS idx_request_logs_ip ON request_logs(ip, timestamp);
"#;
