//! Error handling
//!
//! `AppError` is the only error that reaches an HTTP response, and it always
//! renders as an ordinary-looking API error. The other enums describe failures
//! of the outbound collaborators; each has a local fallback and never unwinds
//! past the response boundary.

use axum::{
    response::{IntoResponse, Response},
    http::StatusCode,
    Json,
};
use serde_json::json;
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    // Request errors
    #[error("invalid request body: {0}")]
    InvalidBody(String),

    #[error("request body unreadable: {0}")]
    BodyUnreadable(String),

    // Generic errors
    #[error("internal error: {0}")]
    InternalError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::InvalidBody(detail) => {
                tracing::debug!("Rejected request body: {}", detail);
                (StatusCode::BAD_REQUEST, "Invalid request body.")
            }
            AppError::BodyUnreadable(detail) => {
                tracing::debug!("Unreadable request body: {}", detail);
                (StatusCode::BAD_REQUEST, "Bad request.")
            }
            AppError::InternalError(detail) => {
                tracing::error!("Internal error: {}", detail);
                (StatusCode::SERVICE_UNAVAILABLE, "Service Unavailable")
            }
        };

        let body = Json(json!({
            "status": "error",
            "message": message,
        }));

        (status, body).into_response()
    }
}

/// Failure of an outbound relay call (decoy or upstream)
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("relay target timed out: {0}")]
    Timeout(String),

    #[error("relay target unreachable: {0}")]
    Connect(String),

    #[error("invalid relay target: {0}")]
    InvalidTarget(String),

    #[error("relay transport failure: {0}")]
    Transport(String),
}

impl From<reqwest::Error> for RelayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            RelayError::Timeout(err.to_string())
        } else if err.is_connect() {
            RelayError::Connect(err.to_string())
        } else if err.is_builder() {
            RelayError::InvalidTarget(err.to_string())
        } else {
            RelayError::Transport(err.to_string())
        }
    }
}

/// Failure of a geo-location lookup
#[derive(Debug, Error)]
pub enum GeoError {
    #[error("geo lookup disabled")]
    Disabled,

    #[error("address is not publicly routable")]
    NonRoutable,

    #[error("geo lookup request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("geo lookup found no match: {0}")]
    NoMatch(String),
}

/// Failure to read or write the telemetry header
#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("telemetry header not present")]
    Missing,

    #[error("telemetry header is not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("telemetry record missing required field `{0}`")]
    MissingField(&'static str),

    #[error("telemetry record could not be encoded as a header: {0}")]
    Encode(String),
}

/// Failure of a forensic store write
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("store is closed")]
    Closed,
}
