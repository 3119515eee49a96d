//! HTTP shaping for the gateway's fault taxonomy.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use parlance_core::Error;
use serde_json::json;
use tracing::{error, warn};

/// Wrapper turning a domain error into an HTTP response.
///
/// Validation faults become 400, missing things 404, timeouts 504, broken
/// agent configuration 500 with a remediation hint, and everything else a
/// generic 500. Response bodies are always `{"detail": <message>}`.
pub struct ApiError(pub Error);

impl<E> From<E> for ApiError
where
    E: Into<Error>,
{
    fn from(e: E) -> Self {
        Self(e.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match &self.0 {
            Error::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Error::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            Error::Config { message } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Agent initialization failed: {message}"),
            ),
            Error::Timeout(_) => (StatusCode::GATEWAY_TIMEOUT, self.0.to_string()),
            other => (StatusCode::INTERNAL_SERVER_ERROR, other.to_string()),
        };

        if status.is_server_error() {
            error!(status = %status, detail = %detail, "Request failed");
        } else {
            warn!(status = %status, detail = %detail, "Request rejected");
        }

        (status, Json(json!({ "detail": detail }))).into_response()
    }
}
