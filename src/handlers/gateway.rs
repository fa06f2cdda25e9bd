//! Gateway handlers
//!
//! Every request under the gateway prefix is logged, screened, and then either
//! diverted to the decoy or passed to the real upstream. Whichever target
//! answers, its response goes back to the caller as-is. When the target cannot
//! be reached the caller gets the configured fallback instead of an error.

use std::collections::BTreeMap;
use std::net::IpAddr;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde_json::json;

use crate::classifier::{screen, ScreenReason};
use crate::config::GatewayMode;
use crate::error::TelemetryError;
use crate::middleware::inbound::{gateway_client_ip, InboundRequest};
use crate::models::RequestLog;
use crate::relay::fallback_response;
use crate::store::{spawn_append, spawn_record_request};
use crate::telemetry;
use crate::GatewayState;

pub async fn intercept(State(state): State<GatewayState>, req: InboundRequest) -> Response {
    let client_ip = gateway_client_ip(&req.headers, req.peer, state.config.trust_proxy);
    let reason = screen(req.path_and_query(), &req.headers, &req.body);
    let divert = state.config.gateway_mode == GatewayMode::DivertAll || reason.is_some();

    match reason {
        Some(reason) => tracing::info!(
            method = %req.method,
            url = %req.path_and_query(),
            ip = ?client_ip,
            %reason,
            "Suspicious request, diverting to decoy"
        ),
        None => tracing::info!(
            method = %req.method,
            url = %req.path_and_query(),
            ip = ?client_ip,
            divert,
            "Gateway request"
        ),
    }

    spawn_record_request(state.store.clone(), request_log(&req, client_ip, reason));

    if divert {
        divert_to_decoy(&state, &req, client_ip).await
    } else {
        pass_through(&state, &req, client_ip).await
    }
}

/// Relay to the decoy and harvest its telemetry
async fn divert_to_decoy(state: &GatewayState, req: &InboundRequest, client_ip: Option<IpAddr>) -> Response {
    let mut relayed = match state.decoy.forward(req, client_ip).await {
        Ok(relayed) => relayed,
        Err(e) => {
            tracing::error!(relay_target = %state.decoy.target(), url = %req.path_and_query(), error = %e, "Relay Error");
            return fallback_response(state.config.relay_fallback);
        }
    };

    match relayed.take_telemetry() {
        Ok(event) => spawn_append(state.store.clone(), event),
        Err(TelemetryError::Missing) => {
            tracing::debug!(url = %req.path_and_query(), "Decoy response carried no telemetry");
        }
        Err(e) => {
            tracing::warn!(url = %req.path_and_query(), error = %e, "Discarding malformed telemetry");
        }
    }

    relayed.into_response()
}

/// Relay benign traffic to the real API
async fn pass_through(state: &GatewayState, req: &InboundRequest, client_ip: Option<IpAddr>) -> Response {
    match state.upstream.forward(req, client_ip).await {
        Ok(relayed) => relayed.into_response(),
        Err(e) => {
            tracing::error!(relay_target = %state.upstream.target(), url = %req.path_and_query(), error = %e, "Upstream Error");
            fallback_response(state.config.relay_fallback)
        }
    }
}

/// Paths outside the gateway prefix
pub async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "status": "error", "message": "Not Found" })),
    )
}

fn request_log(req: &InboundRequest, client_ip: Option<IpAddr>, reason: Option<ScreenReason>) -> RequestLog {
    let payload = if req.is_bodiless() {
        Query::<BTreeMap<String, String>>::try_from_uri(&req.uri)
            .ok()
            .map(|Query(params)| params)
            .filter(|params| !params.is_empty())
            .and_then(|params| serde_json::to_value(params).ok())
    } else if req.body.is_empty() {
        None
    } else {
        let value = serde_json::from_slice(&req.body).unwrap_or_else(|_| {
            serde_json::Value::String(String::from_utf8_lossy(&req.body).into_owned())
        });
        Some(telemetry::cap_payload(value))
    };

    RequestLog {
        ip: client_ip.map(|ip| ip.to_string()).unwrap_or_else(|| "unknown".to_string()),
        method: req.method.to_string(),
        url: req.path_and_query().to_string(),
        user_agent: req.user_agent(),
        detected_reason: reason.map(|r| r.to_string()),
        payload,
        timestamp: Utc::now(),
    }
}
