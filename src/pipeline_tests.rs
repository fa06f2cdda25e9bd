//! End-to-end tests: real gateway and decoy listeners on loopback

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::http::{HeaderMap, Method, StatusCode};
use axum::response::IntoResponse;
use axum::{Json, Router};
use parking_lot::Mutex;
use serde_json::{json, Value};

use crate::config::{Config, GatewayMode};
use crate::decoy::{DecoyState, FakeLatency, FakeTokenIssuer, Forensics, LoginThrottle};
use crate::geo::DisabledGeoLocator;
use crate::models::{AttackEvent, Severity};
use crate::store::{ForensicStore, MemoryStore};
use crate::telemetry::{SESSION_HEADER, TELEMETRY_HEADER};
use crate::{create_decoy_router, create_gateway_router, GatewayState};

// ============================================================================
// HARNESS
// ============================================================================

async fn spawn(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
            .await
            .unwrap()
    });
    addr
}

async fn spawn_decoy() -> SocketAddr {
    let state = DecoyState {
        forensics: Arc::new(Forensics::new(Arc::new(DisabledGeoLocator), true)),
        throttle: Arc::new(LoginThrottle::new(5, Duration::from_secs(900))),
        tokens: Arc::new(FakeTokenIssuer::new("pipeline-secret")),
    };
    spawn(create_decoy_router(state, FakeLatency::new(0..=5))).await
}

/// Accepts connections and never answers
async fn spawn_stalled() -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    addr
}

async fn unused_addr() -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

struct Gateway {
    base: String,
    store: Arc<MemoryStore>,
}

async fn spawn_gateway(mode: GatewayMode, decoy: SocketAddr, upstream: SocketAddr) -> Gateway {
    spawn_gateway_with_timeout(mode, decoy, upstream, 5).await
}

async fn spawn_gateway_with_timeout(
    mode: GatewayMode,
    decoy: SocketAddr,
    upstream: SocketAddr,
    relay_timeout_secs: u64,
) -> Gateway {
    let config = Config {
        gateway_mode: mode,
        decoy_url: format!("http://{}", decoy),
        upstream_url: format!("http://{}", upstream),
        relay_timeout_secs,
        ..Config::default()
    };
    let store = Arc::new(MemoryStore::default());
    let shared: Arc<dyn ForensicStore> = store.clone();
    let state = GatewayState::new(Arc::new(config), shared).unwrap();
    let addr = spawn(create_gateway_router(state)).await;

    Gateway { base: format!("http://{}", addr), store }
}

async fn wait_for_events(store: &MemoryStore, count: usize) -> Vec<AttackEvent> {
    for _ in 0..100 {
        let events = store.events();
        if events.len() >= count {
            return events;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    store.events()
}

fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}

// ============================================================================
// SCENARIOS
// ============================================================================

#[tokio::test]
async fn test_injection_login_is_diverted_and_logged() {
    let decoy = spawn_decoy().await;
    let gateway = spawn_gateway(GatewayMode::Screen, decoy, unused_addr().await).await;

    let response = client()
        .post(format!("{}/api/auth/login", gateway.base))
        .header("content-type", "application/json")
        .body(r#"{"username":"admin' OR '1'='1"}"#)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get(TELEMETRY_HEADER).is_none());
    assert!(response.headers().get(SESSION_HEADER).is_some());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "success");
    assert_eq!(body["message"], "Login successful.");

    let events = wait_for_events(&gateway.store, 1).await;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].attack_type, "Injection Attempt");
    assert_eq!(events[0].severity, Severity::High);
    assert_eq!(events[0].ip_address, "127.0.0.1");
    assert_eq!(events[0].target_url, "/api/auth/login");

    let requests = gateway.store.requests();
    assert_eq!(requests[0].detected_reason.as_deref(), Some("SQL Injection"));
}

#[tokio::test]
async fn test_unmapped_path_gets_not_found_and_low_event() {
    let decoy = spawn_decoy().await;
    let gateway = spawn_gateway(GatewayMode::DivertAll, decoy, unused_addr().await).await;

    let response = client()
        .get(format!("{}/api/some/unmapped/path", gateway.base))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Cannot GET /api/some/unmapped/path. Resource not found.");

    let events = wait_for_events(&gateway.store, 1).await;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].attack_type, "Reconnaissance");
    assert_eq!(events[0].severity, Severity::Low);
    assert!(events[0].payload.is_none());
}

#[tokio::test]
async fn test_unreachable_decoy_returns_fallback_without_event() {
    let gateway = spawn_gateway(GatewayMode::DivertAll, unused_addr().await, unused_addr().await).await;

    let response = client()
        .get(format!("{}/api/users", gateway.base))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({"status": "error", "message": "Service Unavailable"}));

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(gateway.store.events().is_empty());
}

#[tokio::test]
async fn test_stalled_decoy_times_out_to_fallback_without_event() {
    let gateway =
        spawn_gateway_with_timeout(GatewayMode::DivertAll, spawn_stalled().await, unused_addr().await, 1).await;

    let started = std::time::Instant::now();
    let response = client()
        .post(format!("{}/api/auth/login", gateway.base))
        .header("content-type", "application/json")
        .body(r#"{"email":"a@b.c","password":"x"}"#)
        .send()
        .await
        .unwrap();
    let elapsed = started.elapsed();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({"status": "error", "message": "Service Unavailable"}));
    assert!(elapsed >= Duration::from_millis(900), "returned before the timeout: {:?}", elapsed);
    assert!(elapsed < Duration::from_secs(5), "timeout not enforced: {:?}", elapsed);

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(gateway.store.events().is_empty());
    assert_eq!(gateway.store.requests().len(), 1);
}

#[tokio::test]
async fn test_malformed_telemetry_forwards_body_without_event() {
    let fake_decoy = Router::new().fallback(|| async {
        (
            StatusCode::ACCEPTED,
            [(TELEMETRY_HEADER, "{\"attackType\": broken")],
            "decoy says hi",
        )
    });
    let decoy = spawn(fake_decoy).await;
    let gateway = spawn_gateway(GatewayMode::DivertAll, decoy, unused_addr().await).await;

    let response = client()
        .get(format!("{}/api/users", gateway.base))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert!(response.headers().get(TELEMETRY_HEADER).is_none());
    assert_eq!(response.text().await.unwrap(), "decoy says hi");

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(gateway.store.events().is_empty());
}

// ============================================================================
// RELAY FIDELITY
// ============================================================================

#[derive(Debug, Clone)]
struct Seen {
    method: Method,
    uri: String,
    headers: HeaderMap,
    body: Bytes,
}

#[tokio::test]
async fn test_relay_preserves_method_headers_and_body() {
    let seen: Arc<Mutex<Option<Seen>>> = Arc::new(Mutex::new(None));
    let recorder = seen.clone();
    let capture = Router::new().fallback(
        move |method: Method, uri: axum::http::Uri, headers: HeaderMap, body: Bytes| {
            let recorder = recorder.clone();
            async move {
                *recorder.lock() = Some(Seen { method, uri: uri.to_string(), headers, body });
                StatusCode::NO_CONTENT.into_response()
            }
        },
    );
    let capture_addr = spawn(capture).await;
    let gateway = spawn_gateway(GatewayMode::DivertAll, capture_addr, unused_addr().await).await;

    let payload = b"\x00binary\xffpayload with bytes".to_vec();
    let response = client()
        .put(format!("{}/api/files/7?overwrite=true&tag=a%20b", gateway.base))
        .header("x-custom-probe", "probe-value")
        .header("x-forwarded-for", "198.51.100.1")
        .header("content-type", "application/octet-stream")
        .body(payload.clone())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let seen = seen.lock().clone().unwrap();
    assert_eq!(seen.method, Method::PUT);
    assert_eq!(seen.uri, "/api/files/7?overwrite=true&tag=a%20b");
    assert_eq!(&seen.body[..], &payload[..]);
    assert_eq!(seen.headers["x-custom-probe"], "probe-value");
    assert_eq!(seen.headers["content-type"], "application/octet-stream");
    assert_eq!(seen.headers["x-real-ip"], "127.0.0.1");
    assert_eq!(seen.headers["x-forwarded-for"], "198.51.100.1, 127.0.0.1");
    assert_eq!(seen.headers["host"], capture_addr.to_string().as_str());
}

#[tokio::test]
async fn test_session_id_continues_across_requests() {
    let decoy = spawn_decoy().await;
    let gateway = spawn_gateway(GatewayMode::DivertAll, decoy, unused_addr().await).await;
    let client = client();

    let first = client
        .get(format!("{}/api/profile/me", gateway.base))
        .send()
        .await
        .unwrap();
    let session = first.headers()[SESSION_HEADER].to_str().unwrap().to_string();
    let profile: Value = first.json().await.unwrap();
    assert_eq!(profile["apiKey"], "fake_api_key_zX9qB7yP3sF5aC8t");

    let second = client
        .get(format!("{}/api/admin/logs", gateway.base))
        .header(SESSION_HEADER, &session)
        .send()
        .await
        .unwrap();
    assert!(second.headers().get(SESSION_HEADER).is_none());

    let events = wait_for_events(&gateway.store, 2).await;
    assert_eq!(events.len(), 2);
    assert!(events.iter().all(|e| e.session_id == session));
    assert!(events.iter().any(|e| e.attack_type == "Administrative Reconnaissance"));
}

#[tokio::test]
async fn test_benign_traffic_passes_to_upstream() {
    let upstream = Router::new().fallback(|| async {
        (
            [(TELEMETRY_HEADER, "{\"leak\":true}")],
            Json(json!({"real": true})),
        )
    });
    let upstream_addr = spawn(upstream).await;
    let decoy = spawn_decoy().await;
    let gateway = spawn_gateway(GatewayMode::Screen, decoy, upstream_addr).await;

    let response = client()
        .get(format!("{}/api/products?page=2", gateway.base))
        .header("user-agent", "Mozilla/5.0 (Macintosh)")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get(TELEMETRY_HEADER).is_none());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({"real": true}));

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(gateway.store.events().is_empty());
    let requests = gateway.store.requests();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].detected_reason.is_none());
}

#[tokio::test]
async fn test_tool_agent_is_diverted_in_screen_mode() {
    let decoy = spawn_decoy().await;
    let gateway = spawn_gateway(GatewayMode::Screen, decoy, unused_addr().await).await;

    let response = client()
        .get(format!("{}/api/billing/subscription", gateway.base))
        .header("user-agent", "sqlmap/1.7.2")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let events = wait_for_events(&gateway.store, 1).await;
    assert_eq!(events[0].attack_type, "Financial Reconnaissance");
    assert_eq!(events[0].user_agent, "sqlmap/1.7.2");
}

#[tokio::test]
async fn test_login_throttle_through_gateway() {
    let decoy = spawn_decoy().await;
    let gateway = spawn_gateway(GatewayMode::DivertAll, decoy, unused_addr().await).await;
    let client = client();

    for attempt in 1..=5 {
        let response = client
            .post(format!("{}/api/auth/login", gateway.base))
            .header("content-type", "application/json")
            .body(r#"{"email":"victim@example.com","password":"hunter2"}"#)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK, "attempt {}", attempt);
        assert_eq!(
            response.headers()["ratelimit-remaining"],
            (5 - attempt).to_string().as_str()
        );
    }

    let limited = client
        .post(format!("{}/api/auth/login", gateway.base))
        .header("content-type", "application/json")
        .body(r#"{"email":"victim@example.com","password":"hunter3"}"#)
        .send()
        .await
        .unwrap();
    assert_eq!(limited.status(), StatusCode::TOO_MANY_REQUESTS);

    let events = wait_for_events(&gateway.store, 6).await;
    assert_eq!(events.len(), 6);
    assert!(events.iter().all(|e| e.attack_type == "Brute Force / Session Start"));
}

#[tokio::test]
async fn test_gateway_health_and_outside_prefix() {
    let gateway = spawn_gateway(GatewayMode::DivertAll, unused_addr().await, unused_addr().await).await;

    let health = client().get(format!("{}/health", gateway.base)).send().await.unwrap();
    assert_eq!(health.status(), StatusCode::OK);
    let body: Value = health.json().await.unwrap();
    assert_eq!(body["status"], "healthy");

    let outside = client().get(format!("{}/static/app.js", gateway.base)).send().await.unwrap();
    assert_eq!(outside.status(), StatusCode::NOT_FOUND);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(gateway.store.requests().is_empty());
}

#[tokio::test]
async fn test_decoy_root_status_is_not_logged() {
    let decoy = spawn_decoy().await;
    let response = client().get(format!("http://{}/", decoy)).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get(TELEMETRY_HEADER).is_none());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["service"], "Honeypot Server");
    assert_eq!(body["message"], "Trap is deployed and waiting.");
}
