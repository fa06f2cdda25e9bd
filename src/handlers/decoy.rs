//! Decoy trap handlers
//!
//! Every handler runs the forensic extractor first and stamps its result on
//! whatever response goes out, including validation errors and the fake rate
//! limit.

use axum::extract::State;
use axum::response::{IntoResponse, Response};

use crate::decoy::payloads::{self, FAKE_LOGIN_USER_ID};
use crate::decoy::schema::{self, LoginRequest, ProfileUpdate, RefreshRequest, RegisterRequest};
use crate::decoy::{Capture, DecoyState, Trap};
use crate::middleware::inbound::InboundRequest;
use crate::AppError;

const DEFAULT_SUBJECT: &str = "user";

pub async fn serve_trap(trap: Trap, state: DecoyState, req: InboundRequest) -> Response {
    let capture = state.forensics.capture(&req).await;

    let response = match trap {
        Trap::Login => login(&state, &capture, &req),
        Trap::Register => match schema::parse::<RegisterRequest>(&req.body) {
            Ok(_) => payloads::register(),
            Err(e) => e.into_response(),
        },
        Trap::TokenRefresh => match schema::parse::<RefreshRequest>(&req.body) {
            Ok(_) => payloads::token_refresh(&state.tokens.issue(DEFAULT_SUBJECT, FAKE_LOGIN_USER_ID)),
            Err(e) => e.into_response(),
        },
        Trap::Users => payloads::users(),
        Trap::UserById => payloads::user_by_id(last_segment(req.uri.path())),
        Trap::Profile => payloads::profile(),
        Trap::ProfileUpdate => profile_update(&req),
        Trap::Products => payloads::products(),
        Trap::AdminConfig => payloads::admin_config(),
        Trap::AdminLogs => payloads::admin_logs(),
        Trap::Subscription => payloads::subscription(),
        Trap::Invoices => payloads::invoices(),
        Trap::InternalHealth => payloads::internal_health(),
        Trap::FileUpload => payloads::upload(&req.body),
    };

    capture.stamp(response)
}

/// Anything the route table does not know
pub async fn catch_all(State(state): State<DecoyState>, req: InboundRequest) -> Response {
    let capture = state.forensics.capture(&req).await;
    capture.stamp(payloads::not_found(&req.method, req.path_and_query()))
}

fn login(state: &DecoyState, capture: &Capture, req: &InboundRequest) -> Response {
    let decision = state.throttle.check(capture.client_key());

    let mut response = if decision.allowed {
        match schema::parse::<LoginRequest>(&req.body) {
            Ok(body) => {
                let subject = body.email.unwrap_or_else(|| DEFAULT_SUBJECT.to_string());
                payloads::login(&state.tokens.issue(&subject, FAKE_LOGIN_USER_ID))
            }
            Err(e) => e.into_response(),
        }
    } else {
        tracing::debug!(ip = %capture.client_key(), "Fake login limit reached");
        payloads::too_many_login_attempts()
    };

    decision.apply(response.headers_mut());
    response
}

fn profile_update(req: &InboundRequest) -> Response {
    let update = match schema::parse::<ProfileUpdate>(&req.body) {
        Ok(update) => update,
        Err(e) => return e.into_response(),
    };
    match serde_json::to_value(&update) {
        Ok(data) => payloads::profile_updated(data),
        Err(e) => AppError::InternalError(e.to_string()).into_response(),
    }
}

fn last_segment(path: &str) -> &str {
    path.trim_end_matches('/').rsplit('/').next().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoy::{api_router, FakeTokenIssuer, Forensics, LoginThrottle};
    use crate::geo::DisabledGeoLocator;
    use crate::models::Severity;
    use crate::telemetry::{self, SESSION_HEADER};
    use axum::body::{to_bytes, Body};
    use axum::extract::{ConnectInfo, Request};
    use axum::http::{Method, StatusCode};
    use axum::Router;
    use serde_json::{json, Value};
    use std::net::SocketAddr;
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;

    fn decoy_app(limit: u32) -> Router {
        let state = DecoyState {
            forensics: Arc::new(Forensics::new(Arc::new(DisabledGeoLocator), true)),
            throttle: Arc::new(LoginThrottle::new(limit, Duration::from_secs(900))),
            tokens: Arc::new(FakeTokenIssuer::new("test-secret")),
        };
        Router::new()
            .nest("/api", api_router())
            .fallback(catch_all)
            .with_state(state)
    }

    fn request(method: Method, uri: &str, body: &str) -> Request {
        let mut req = axum::http::Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .header("x-real-ip", "198.51.100.77")
            .body(Body::from(body.to_string()))
            .unwrap();
        req.extensions_mut()
            .insert(ConnectInfo::<SocketAddr>("127.0.0.1:40000".parse().unwrap()));
        req
    }

    async fn send(app: &Router, req: Request) -> (StatusCode, axum::http::HeaderMap, Value) {
        let response = app.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, headers, body)
    }

    #[test]
    fn test_last_segment() {
        assert_eq!(last_segment("/api/users/42"), "42");
        assert_eq!(last_segment("/api/users/42/"), "42");
    }

    #[tokio::test]
    async fn test_login_returns_token_and_telemetry() {
        let app = decoy_app(5);
        let (status, headers, body) = send(
            &app,
            request(Method::POST, "/api/auth/login", r#"{"username":"admin' OR '1'='1"}"#),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "success");
        assert_eq!(body["token"].as_str().unwrap().split('.').count(), 3);
        assert_eq!(headers["ratelimit-limit"], "5");

        let event = telemetry::extract(&headers).unwrap();
        assert_eq!(event.attack_type, "Injection Attempt");
        assert_eq!(event.severity, Severity::High);
        assert_eq!(event.target_url, "/api/auth/login");
        assert_eq!(event.ip_address, "198.51.100.77");
        assert!(headers.get(SESSION_HEADER).is_some());
    }

    #[tokio::test]
    async fn test_login_limit_still_reports_telemetry() {
        let app = decoy_app(2);
        for _ in 0..2 {
            let (status, _, _) = send(&app, request(Method::POST, "/api/auth/login", "{}")).await;
            assert_eq!(status, StatusCode::OK);
        }

        let (status, headers, body) = send(&app, request(Method::POST, "/api/auth/login", "{}")).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            body["message"],
            "Too many login attempts from this IP, please try again after 15 minutes"
        );
        assert_eq!(headers["ratelimit-remaining"], "0");
        assert_eq!(telemetry::extract(&headers).unwrap().attack_type, "Brute Force / Session Start");
    }

    #[tokio::test]
    async fn test_unmapped_path_is_logged_not_found() {
        let app = decoy_app(5);
        let (status, headers, body) = send(&app, request(Method::GET, "/api/some/unmapped/path", "")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Cannot GET /api/some/unmapped/path. Resource not found.");

        let event = telemetry::extract(&headers).unwrap();
        assert_eq!(event.attack_type, "Reconnaissance");
        assert_eq!(event.severity, Severity::Low);
    }

    #[tokio::test]
    async fn test_wrong_method_on_known_path_hits_catch_all() {
        let app = decoy_app(5);
        let (status, headers, body) = send(&app, request(Method::DELETE, "/api/users", "")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Cannot DELETE /api/users. Resource not found.");
        assert!(telemetry::extract(&headers).is_ok());
    }

    #[tokio::test]
    async fn test_invalid_body_is_plain_400_with_telemetry() {
        let app = decoy_app(5);
        let (status, headers, body) = send(&app, request(Method::POST, "/api/profile/update", "{oops")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"status": "error", "message": "Invalid request body."}));

        let event = telemetry::extract(&headers).unwrap();
        assert_eq!(event.payload, Some(Value::String("{oops".into())));
    }

    #[tokio::test]
    async fn test_profile_update_echoes_fields() {
        let app = decoy_app(5);
        let (status, _, body) = send(
            &app,
            request(Method::POST, "/api/profile/update", r#"{"firstName":"Eve","team":"Ops"}"#),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"], json!({"firstName": "Eve", "team": "Ops"}));
    }

    #[tokio::test]
    async fn test_billing_and_upload_classification() {
        let app = decoy_app(5);
        let (_, headers, _) = send(&app, request(Method::GET, "/api/billing/invoices", "")).await;
        assert_eq!(telemetry::extract(&headers).unwrap().severity, Severity::High);

        let (status, headers, body) = send(
            &app,
            request(Method::POST, "/api/upload/file", "<script>alert(1)</script>"),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["size"], 25);
        let event = telemetry::extract(&headers).unwrap();
        assert_eq!(event.severity, Severity::Critical);
        assert_eq!(event.payload_analysis, "Confirmed Malicious Code");
    }

    #[tokio::test]
    async fn test_user_by_id_uses_path_id() {
        let app = decoy_app(5);
        let (status, _, body) = send(&app, request(Method::GET, "/api/users/1337", "")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], "1337");
    }
}
