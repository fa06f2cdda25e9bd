//! Inbound request capture
//!
//! Both surfaces work on a fully buffered copy of the request. The extractor
//! never fails with an axum rejection; unreadable bodies become `AppError`,
//! which renders as a plain API error.

use std::net::{IpAddr, SocketAddr};
use std::time::Instant;

use axum::body::Bytes;
use axum::extract::{ConnectInfo, FromRequest, OriginalUri, Request};
use axum::http::{HeaderMap, Method, Uri};

use crate::AppError;

pub const X_REAL_IP: &str = "x-real-ip";
pub const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// When the request entered the service, set by the outermost middleware
#[derive(Debug, Clone, Copy)]
pub struct RequestStart(pub Instant);

#[derive(Debug, Clone)]
pub struct InboundRequest {
    pub method: Method,
    /// Path and query as the caller sent them
    pub uri: Uri,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub peer: Option<SocketAddr>,
    pub received_at: Instant,
}

impl InboundRequest {
    pub fn path_and_query(&self) -> &str {
        self.uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or_else(|| self.uri.path())
    }

    pub fn user_agent(&self) -> Option<String> {
        self.headers
            .get(axum::http::header::USER_AGENT)
            .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
    }

    /// GET and friends carry no meaningful body
    pub fn is_bodiless(&self) -> bool {
        matches!(self.method, Method::GET | Method::HEAD | Method::OPTIONS | Method::TRACE)
    }
}

#[axum::async_trait]
impl<S> FromRequest<S> for InboundRequest
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let peer = req
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);
        let received_at = req
            .extensions()
            .get::<RequestStart>()
            .map(|start| start.0)
            .unwrap_or_else(Instant::now);
        let uri = req
            .extensions()
            .get::<OriginalUri>()
            .map(|OriginalUri(uri)| uri.clone())
            .unwrap_or_else(|| req.uri().clone());
        let method = req.method().clone();
        let headers = req.headers().clone();

        let body = Bytes::from_request(req, state)
            .await
            .map_err(|e| AppError::BodyUnreadable(e.to_string()))?;

        Ok(Self { method, uri, headers, body, peer, received_at })
    }
}

// ============================================================================
// CLIENT ADDRESS RESOLUTION
// ============================================================================

fn first_forwarded(headers: &HeaderMap) -> Option<IpAddr> {
    headers
        .get(X_FORWARDED_FOR)
        .and_then(|v| v.to_str().ok())
        .and_then(|chain| chain.split(',').next())
        .and_then(|first| first.trim().parse().ok())
}

fn real_ip(headers: &HeaderMap) -> Option<IpAddr> {
    headers
        .get(X_REAL_IP)
        .and_then(|v| v.to_str().ok())
        .and_then(|ip| ip.trim().parse().ok())
}

/// Caller address as the gateway sees it: leftmost X-Forwarded-For when the
/// upstream proxy is trusted, else the socket peer.
pub fn gateway_client_ip(headers: &HeaderMap, peer: Option<SocketAddr>, trust_proxy: bool) -> Option<IpAddr> {
    if trust_proxy {
        if let Some(ip) = first_forwarded(headers) {
            return Some(ip);
        }
    }
    peer.map(|addr| addr.ip())
}

/// Caller address as the decoy sees it: X-Real-IP from the relay, then
/// X-Forwarded-For, then the socket peer.
pub fn decoy_client_ip(headers: &HeaderMap, peer: Option<SocketAddr>, trust_forwarded: bool) -> Option<IpAddr> {
    if trust_forwarded {
        if let Some(ip) = real_ip(headers).or_else(|| first_forwarded(headers)) {
            return Some(ip);
        }
    }
    peer.map(|addr| addr.ip())
}
