//! Gateway error types and their HTTP mapping.
//!
//! Every failure leaves the gateway as a JSON body with a `detail` field.
//! The status is either fixed on the gateway side (400, 502, 504) or the
//! backend's own status code passed through unchanged.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

/// Error type for every gateway route.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Caller-side contract violation.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Backend answered with a body that is not JSON.
    #[error("Backend returned non-JSON response ({status}): {detail}")]
    Backend { status: StatusCode, detail: String },

    /// The outbound call itself failed (connect, DNS, timeout, body read).
    #[error("Transport failure: {message}")]
    Transport { timed_out: bool, message: String },
}

impl GatewayError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    /// HTTP status this error is surfaced with.
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Backend { status, .. } => *status,
            Self::Transport {
                timed_out: true, ..
            } => StatusCode::GATEWAY_TIMEOUT,
            Self::Transport { .. } => StatusCode::BAD_GATEWAY,
        }
    }

    /// Stable discriminant for the `type` field of the error body.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "bad_request",
            Self::Backend { .. } => "backend_error",
            Self::Transport { .. } => "transport_error",
        }
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport {
            timed_out: err.is_timeout(),
            message: err.to_string(),
        }
    }
}

/// JSON error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub detail: String,
    #[serde(rename = "type")]
    pub error_type: &'static str,
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error_type = self.kind();
        let detail = match self {
            Self::BadRequest(msg) => msg,
            // Raw backend text, unmodified.
            Self::Backend { detail, .. } => detail,
            Self::Transport { message, .. } => message,
        };

        (status, Json(ErrorBody { detail, error_type })).into_response()
    }
}
