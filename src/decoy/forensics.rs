//! Forensic extractor
//!
//! Runs on every decoy hit before the fake response is built: who is calling,
//! from where, what they sent, and how the classifier reads it. The resulting
//! `AttackEvent` rides back to the relay in the telemetry header.

use std::sync::Arc;

use axum::http::HeaderValue;
use axum::response::Response;
use chrono::Utc;
use uuid::Uuid;

use crate::classifier::classify;
use crate::geo::{resolve_location, GeoLocator};
use crate::middleware::inbound::{decoy_client_ip, InboundRequest};
use crate::models::{AttackEvent, NO_SESSION};
use crate::telemetry::{self, SESSION_HEADER, TELEMETRY_HEADER};

const UNKNOWN_AGENT: &str = "unknown";
const UNKNOWN_IP: &str = "unknown";

pub struct Forensics {
    geo: Arc<dyn GeoLocator>,
    trust_forwarded: bool,
}

/// Event assembled for one request, plus the session id if this request
/// started a new session.
#[derive(Debug, Clone)]
pub struct Capture {
    pub event: AttackEvent,
    pub minted_session: Option<String>,
}

impl Forensics {
    pub fn new(geo: Arc<dyn GeoLocator>, trust_forwarded: bool) -> Self {
        Self { geo, trust_forwarded }
    }

    pub async fn capture(&self, req: &InboundRequest) -> Capture {
        let ip = decoy_client_ip(&req.headers, req.peer, self.trust_forwarded);
        let user_agent = req.user_agent().unwrap_or_else(|| UNKNOWN_AGENT.to_string());

        let incoming_session = req
            .headers
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        let minted_session = match incoming_session {
            Some(_) => None,
            None => Some(Uuid::new_v4().to_string()),
        };
        let session_id = incoming_session
            .or_else(|| minted_session.clone())
            .unwrap_or_else(|| NO_SESSION.to_string());

        let location = resolve_location(self.geo.as_ref(), ip).await;

        let body_text = String::from_utf8_lossy(&req.body);
        let target_url = req.path_and_query().to_string();
        let classification = classify(&target_url, &body_text, &req.method);

        let event = AttackEvent {
            session_id,
            attack_type: classification.attack_type.as_str().to_string(),
            severity: classification.severity,
            payload_analysis: classification.analysis.to_string(),
            ip_address: ip.map(|ip| ip.to_string()).unwrap_or_else(|| UNKNOWN_IP.to_string()),
            location,
            user_agent,
            target_url,
            http_method: req.method.as_str().to_string(),
            latency_ms: req.received_at.elapsed().as_millis() as u64,
            payload: captured_payload(req),
            headers: telemetry::cap_headers(&req.headers),
            timestamp: Utc::now(),
        };

        tracing::debug!(
            session = %event.session_id,
            ip = %event.ip_address,
            method = %event.http_method,
            url = %event.target_url,
            attack_type = %event.attack_type,
            "Decoy hit"
        );

        Capture { event, minted_session }
    }
}

/// Request body for the event: JSON when it parses, text otherwise, absent
/// for bodiless methods.
fn captured_payload(req: &InboundRequest) -> Option<serde_json::Value> {
    if req.is_bodiless() || req.body.is_empty() {
        return None;
    }
    let value = serde_json::from_slice(&req.body).unwrap_or_else(|_| {
        serde_json::Value::String(String::from_utf8_lossy(&req.body).into_owned())
    });
    Some(telemetry::cap_payload(value))
}

impl Capture {
    /// Attach the telemetry header and, for new sessions, the session header
    pub fn stamp(&self, mut response: Response) -> Response {
        let headers = response.headers_mut();
        match telemetry::encode(&self.event) {
            Ok(value) => {
                headers.insert(TELEMETRY_HEADER, value);
            }
            Err(e) => tracing::warn!(error = %e, "Telemetry header could not be encoded"),
        }
        if let Some(session) = &self.minted_session {
            if let Ok(value) = HeaderValue::from_str(session) {
                headers.insert(SESSION_HEADER, value);
            }
        }
        response
    }

    pub fn client_key(&self) -> &str {
        &self.event.ip_address
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::DisabledGeoLocator;
    use crate::models::{Severity, UNKNOWN_LOCATION};
    use axum::body::Bytes;
    use axum::http::{HeaderMap, Method};
    use axum::response::IntoResponse;
    use std::time::Instant;

    fn forensics() -> Forensics {
        Forensics::new(Arc::new(DisabledGeoLocator), true)
    }

    fn request(method: Method, uri: &str, body: &'static [u8]) -> InboundRequest {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("203.0.113.7"));
        headers.insert("user-agent", HeaderValue::from_static("Mozilla/5.0"));
        InboundRequest {
            method,
            uri: uri.parse().unwrap(),
            headers,
            body: Bytes::from_static(body),
            peer: Some("127.0.0.1:9000".parse().unwrap()),
            received_at: Instant::now(),
        }
    }

    #[tokio::test]
    async fn test_first_contact_mints_session() {
        let capture = forensics().capture(&request(Method::GET, "/api/users", b"")).await;
        let minted = capture.minted_session.clone().unwrap();
        assert!(Uuid::parse_str(&minted).is_ok());
        assert_eq!(capture.event.session_id, minted);
        assert_eq!(capture.event.ip_address, "203.0.113.7");
        assert_eq!(capture.event.location, UNKNOWN_LOCATION);
        assert_eq!(capture.event.target_url, "/api/users");
        assert!(capture.event.payload.is_none());
    }

    #[tokio::test]
    async fn test_returning_session_is_echoed_not_minted() {
        let mut req = request(Method::GET, "/api/profile/me", b"");
        req.headers.insert(SESSION_HEADER, HeaderValue::from_static("session-42"));
        let capture = forensics().capture(&req).await;
        assert!(capture.minted_session.is_none());
        assert_eq!(capture.event.session_id, "session-42");
    }

    #[tokio::test]
    async fn test_body_classified_and_captured() {
        let req = request(Method::POST, "/api/auth/login", br#"{"username":"admin' OR '1'='1"}"#);
        let capture = forensics().capture(&req).await;
        assert_eq!(capture.event.attack_type, "Injection Attempt");
        assert_eq!(capture.event.severity, Severity::High);
        assert_eq!(capture.event.payload.as_ref().unwrap()["username"], "admin' OR '1'='1");
        assert_eq!(capture.event.user_agent, "Mozilla/5.0");
    }

    #[tokio::test]
    async fn test_non_json_body_kept_as_text() {
        let req = request(Method::POST, "/api/upload/file", b"<?php system($_GET['c']); ?>");
        let capture = forensics().capture(&req).await;
        assert_eq!(capture.event.payload_analysis, "Confirmed Malicious Code");
        assert_eq!(
            capture.event.payload,
            Some(serde_json::Value::String("<?php system($_GET['c']); ?>".into()))
        );
    }

    #[tokio::test]
    async fn test_missing_user_agent_defaults() {
        let mut req = request(Method::GET, "/api/products", b"");
        req.headers.remove("user-agent");
        let capture = forensics().capture(&req).await;
        assert_eq!(capture.event.user_agent, UNKNOWN_AGENT);
    }

    #[tokio::test]
    async fn test_stamp_sets_headers_that_round_trip() {
        let capture = forensics().capture(&request(Method::GET, "/api/admin/logs", b"")).await;
        let response = capture.stamp(axum::http::StatusCode::OK.into_response());

        let decoded = telemetry::extract(response.headers()).unwrap();
        assert_eq!(decoded, capture.event);
        assert_eq!(
            response.headers()[SESSION_HEADER],
            capture.minted_session.as_deref().unwrap()
        );
    }
}
