//! Health and status handlers

use axum::Json;
use serde::Serialize;

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
    timestamp: i64,
}

/// Gateway health check
pub async fn check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: chrono::Utc::now().timestamp(),
    })
}

#[derive(Serialize)]
pub struct DecoyStatus {
    status: &'static str,
    service: &'static str,
    message: &'static str,
    version: &'static str,
}

/// Decoy root status page
pub async fn decoy_status() -> Json<DecoyStatus> {
    Json(DecoyStatus {
        status: "ok",
        service: "Honeypot Server",
        message: "Trap is deployed and waiting.",
        version: env!("CARGO_PKG_VERSION"),
    })
}
