//! Deceptive relay
//!
//! Replays a buffered inbound request against a fixed target (decoy or real
//! upstream) and hands back the target's response untouched. Non-2xx statuses
//! are answers, not failures; only transport problems become `RelayError`.

use std::net::IpAddr;
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::config::FallbackPolicy;
use crate::error::{RelayError, TelemetryError};
use crate::middleware::inbound::{InboundRequest, X_FORWARDED_FOR, X_REAL_IP};
use crate::models::AttackEvent;
use crate::telemetry::{self, TELEMETRY_HEADER};

/// Outbound client bound to one base URL
#[derive(Clone)]
pub struct Relay {
    client: reqwest::Client,
    target: String,
}

impl Relay {
    pub fn new(target: impl Into<String>, timeout: Duration) -> Result<Self, RelayError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        Ok(Self {
            client,
            target: target.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    /// Send `req` to the target with its original method, path, query,
    /// headers and body, rewriting only the forwarding headers.
    pub async fn forward(
        &self,
        req: &InboundRequest,
        client_ip: Option<IpAddr>,
    ) -> Result<RelayedResponse, RelayError> {
        let url = format!("{}{}", self.target, req.path_and_query());
        let headers = forwarding_headers(&req.headers, client_ip);

        let mut outbound = self.client
            .request(req.method.clone(), &url)
            .headers(headers);
        if !req.body.is_empty() {
            outbound = outbound.body(req.body.clone());
        }

        let response = outbound.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;

        tracing::debug!(%url, status = status.as_u16(), bytes = body.len(), "Relay target answered");

        Ok(RelayedResponse { status, headers, body })
    }
}

/// Copy of the inbound headers prepared for the next hop
pub fn forwarding_headers(original: &HeaderMap, client_ip: Option<IpAddr>) -> HeaderMap {
    let mut headers = original.clone();
    headers.remove(header::HOST);
    headers.remove(header::CONNECTION);
    // The body is re-sent buffered, so the original framing no longer applies
    headers.remove(header::TRANSFER_ENCODING);

    let Some(ip) = client_ip else {
        return headers;
    };

    if let Ok(value) = HeaderValue::from_str(&ip.to_string()) {
        headers.insert(X_REAL_IP, value);
    }

    let existing = original
        .get_all(X_FORWARDED_FOR)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .collect::<Vec<_>>()
        .join(", ");
    let chain = if existing.is_empty() {
        ip.to_string()
    } else {
        format!("{}, {}", existing, ip)
    };
    if let Ok(value) = HeaderValue::from_str(&chain) {
        headers.insert(X_FORWARDED_FOR, value);
    }

    headers
}

// ============================================================================
// RESPONSE
// ============================================================================

/// Buffered response from the relay target
#[derive(Debug)]
pub struct RelayedResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl RelayedResponse {
    /// Consume the telemetry header. It is removed whether or not it parses.
    pub fn take_telemetry(&mut self) -> Result<AttackEvent, TelemetryError> {
        let result = telemetry::extract(&self.headers);
        self.headers.remove(TELEMETRY_HEADER);
        result
    }
}

impl IntoResponse for RelayedResponse {
    fn into_response(self) -> Response {
        let mut headers = self.headers;
        headers.remove(header::TRANSFER_ENCODING);
        headers.remove(header::CONNECTION);
        headers.remove(TELEMETRY_HEADER);

        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = headers;
        response
    }
}

/// What the caller sees when the relay target cannot be reached
pub fn fallback_response(policy: FallbackPolicy) -> Response {
    match policy {
        FallbackPolicy::Unavailable => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "error", "message": "Service Unavailable" })),
        )
            .into_response(),
        FallbackPolicy::Success => (
            StatusCode::OK,
            Json(json!({ "success": true, "message": "Operation completed successfully." })),
        )
            .into_response(),
    }
}
