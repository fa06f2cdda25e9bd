//! Fabricated decoy payloads
//!
//! Every body here is static or templated from the request. None of it comes
//! from a real backend.

use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{SecondsFormat, Utc};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::tokens::TOKEN_TTL_SECS;

pub const FAKE_LOGIN_USER_ID: &str = "user-fake-id-12345";
pub const FAKE_REGISTER_USER_ID: &str = "user-fake-id-67890";

fn ok(body: Value) -> Response {
    (StatusCode::OK, Json(body)).into_response()
}

fn created(body: Value) -> Response {
    (StatusCode::CREATED, Json(body)).into_response()
}

// ============================================================================
// AUTH
// ============================================================================

pub fn login(token: &str) -> Response {
    ok(json!({
        "status": "success",
        "message": "Login successful.",
        "token": token,
        "userId": FAKE_LOGIN_USER_ID,
    }))
}

pub fn register() -> Response {
    created(json!({
        "status": "success",
        "message": "User registered successfully.",
        "userId": FAKE_REGISTER_USER_ID,
    }))
}

pub fn token_refresh(token: &str) -> Response {
    ok(json!({
        "status": "success",
        "token": token,
        "expiresIn": TOKEN_TTL_SECS,
    }))
}

pub fn too_many_login_attempts() -> Response {
    (
        StatusCode::TOO_MANY_REQUESTS,
        Json(json!({
            "status": "error",
            "message": "Too many login attempts from this IP, please try again after 15 minutes",
        })),
    )
        .into_response()
}

// ============================================================================
// USERS / PROFILE
// ============================================================================

pub fn users() -> Response {
    ok(json!([
        { "id": "user-fake-1", "username": "admin", "role": "admin" },
        { "id": "user-fake-2", "username": "guest", "role": "user" },
        { "id": "user-fake-3", "username": "test_user", "role": "user" },
    ]))
}

pub fn user_by_id(id: &str) -> Response {
    ok(json!({
        "id": id,
        "username": format!("fake_user_{}", id),
        "email": format!("{}@example.com", id),
        "role": "user",
        "last_login": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    }))
}

pub fn profile() -> Response {
    ok(json!({
        "id": FAKE_LOGIN_USER_ID,
        "username": "admin_user_01",
        "email": "admin@internal-systems.com",
        "firstName": "System",
        "lastName": "Administrator",
        "role": "admin",
        "team": "IT_Operations",
        "apiKey": "fake_api_key_zX9qB7yP3sF5aC8t",
        "createdAt": "2023-01-01T10:00:00Z",
    }))
}

pub fn profile_updated(data: Value) -> Response {
    ok(json!({
        "status": "success",
        "message": "Profile updated successfully.",
        "data": data,
    }))
}

// ============================================================================
// DATA / ADMIN
// ============================================================================

pub fn products() -> Response {
    ok(json!([
        { "id": "prod_abc", "name": "Standard Server", "price": 100.0 },
        { "id": "prod_def", "name": "Premium Server", "price": 300.0 },
        { "id": "prod_xyz", "name": "Enterprise Cluster", "price": 2500.0 },
    ]))
}

pub fn admin_config() -> Response {
    ok(json!({
        "status": "success",
        "message": "Configuration updated successfully.",
    }))
}

pub fn admin_logs() -> Response {
    ok(json!({
        "log_count": 3,
        "logs": [
            "2025-10-31T13:30:00Z - INFO - User admin@internal-systems.com logged in.",
            "2025-10-31T13:31:12Z - WARN - Failed login attempt for user: guest",
            "2025-10-31T13:32:05Z - INFO - System backup completed successfully.",
        ],
    }))
}

// ============================================================================
// BILLING
// ============================================================================

pub fn subscription() -> Response {
    ok(json!({
        "id": "sub_1Nf8ZqLkdIwHu7ix",
        "customerId": "cus_OaT3x9Kq2LmV8r",
        "plan": "Enterprise",
        "status": "active",
        "seats": 250,
        "amount": 2500.0,
        "currency": "USD",
        "interval": "month",
        "currentPeriodStart": "2025-10-01T00:00:00Z",
        "currentPeriodEnd": "2025-11-01T00:00:00Z",
        "paymentMethod": {
            "type": "card",
            "brand": "visa",
            "last4": "4242",
            "expMonth": 12,
            "expYear": 2027,
        },
    }))
}

pub fn invoices() -> Response {
    ok(json!([
        {
            "id": "in_1O2kLmN4pQ7rS9tU",
            "number": "INV-2025-0008",
            "amount": 2500.0,
            "currency": "USD",
            "status": "paid",
            "issuedAt": "2025-08-01T00:00:00Z",
            "pdfUrl": "https://billing.internal-systems.com/invoices/INV-2025-0008.pdf",
        },
        {
            "id": "in_1O9vWxY2zA3bC5dE",
            "number": "INV-2025-0009",
            "amount": 2500.0,
            "currency": "USD",
            "status": "paid",
            "issuedAt": "2025-09-01T00:00:00Z",
            "pdfUrl": "https://billing.internal-systems.com/invoices/INV-2025-0009.pdf",
        },
        {
            "id": "in_1OF6gHi8jK0lM2nO",
            "number": "INV-2025-0010",
            "amount": 2500.0,
            "currency": "USD",
            "status": "open",
            "issuedAt": "2025-10-01T00:00:00Z",
            "pdfUrl": "https://billing.internal-systems.com/invoices/INV-2025-0010.pdf",
        },
    ]))
}

// ============================================================================
// INFRASTRUCTURE / FILES
// ============================================================================

pub fn internal_health() -> Response {
    ok(json!({
        "status": "healthy",
        "environment": "production",
        "region": "us-east-1",
        "version": "2.14.3",
        "uptimeSeconds": 1_843_227,
        "services": {
            "database": { "status": "up", "host": "db-primary.internal:5432", "latencyMs": 3 },
            "cache": { "status": "up", "host": "redis-01.internal:6379", "latencyMs": 1 },
            "queue": { "status": "up", "host": "mq.internal:5672", "pending": 12 },
            "storage": { "status": "degraded", "bucket": "internal-backups-prod", "usedPercent": 87 },
        },
    }))
}

pub fn upload(body: &[u8]) -> Response {
    let digest = Sha256::digest(body);
    created(json!({
        "status": "success",
        "fileId": format!("file_{}", Uuid::new_v4().simple()),
        "size": body.len(),
        "sha256": format!("{:x}", digest),
    }))
}

// ============================================================================
// CATCH-ALL
// ============================================================================

pub fn not_found(method: &Method, url: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "status": "error",
            "message": format!("Cannot {} {}. Resource not found.", method, url),
            "tip": "The requested resource could not be found on this server.",
        })),
    )
        .into_response()
}
