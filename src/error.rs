use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use log::error;
use serde_json::json;
use thiserror::Error;

/// Error taxonomy for the proxy layer and the stream consumer.
///
/// `Config` and `Validation` are detected before any network I/O happens.
/// `Upstream` and `Timeout` come from the network boundary and are never
/// retried. A single malformed stream frame is recovered locally inside the
/// consumer and never surfaces as one of these.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("server configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Validation(String),

    #[error("upstream returned status {status}")]
    Upstream { status: StatusCode, body: String },

    #[error("upstream request timed out")]
    Timeout,

    #[error("chat request failed with status {0}")]
    RequestFailed(StatusCode),

    #[error("response body stream unavailable: {0}")]
    StreamUnavailable(reqwest::Error),

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        match self {
            ProxyError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": msg }))).into_response()
            }
            ProxyError::Config(msg) => {
                error!("configuration error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "Server configuration error" })),
                )
                    .into_response()
            }
            // Upstream status and body pass through unmodified.
            ProxyError::Upstream { status, body } => (status, body).into_response(),
            ProxyError::Timeout => (
                StatusCode::GATEWAY_TIMEOUT,
                Json(json!({ "error": "Upstream request timed out" })),
            )
                .into_response(),
            other => {
                error!("unexpected proxy error: {}", other);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "Internal server error" })),
                )
                    .into_response()
            }
        }
    }
}
