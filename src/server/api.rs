use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use log::error;
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};

use crate::error::ProxyError;
use crate::models::chat::ChatProxyRequest;
use crate::models::{
    BalanceRequest, GiphyQuery, HealthProbeRequest, HealthProbeResponse, LinkSummaryRequest,
    SwapRequest, UpstreamBalanceRequest,
};
use crate::upstream::{GiphyClient, UpstreamClient, UpstreamOutcome};

const WHALE_NOT_FOUND: &str = "The requested resource was not found on the server";

#[derive(Clone)]
pub struct AppState {
    pub upstream: Arc<UpstreamClient>,
    pub giphy: Arc<GiphyClient>,
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/v1/chat/completions", post(chat_completions_handler))
        .route("/api/v1/whales/transactions", get(whale_transactions_handler))
        .route("/api/v1/health", post(health_handler))
        .route("/api/v1/image/list", get(image_list_handler))
        .route("/api/v1/image/meme", get(image_meme_handler))
        .route("/api/v1/jupiter/balance", post(jupiter_balance_handler))
        .route("/api/v1/jupiter/swap", post(jupiter_swap_handler))
        .route("/api/v1/tools/code", post(tools_code_handler))
        .route("/api/v1/tools/linksummary", post(tools_linksummary_handler))
        .route("/api/v1/giphy", get(giphy_handler))
        .layer(cors)
        .with_state(state)
}

// Validates a raw JSON body against a typed request shape, before any
// upstream call is made.
fn parse_body<T: serde::de::DeserializeOwned>(body: Value) -> Result<T, ProxyError> {
    serde_json::from_value(body)
        .map_err(|e| ProxyError::Validation(format!("Invalid request body: {}", e)))
}

// Relays an upstream outcome as JSON, passing failure status and body
// through unmodified.
async fn relay_json(outcome: UpstreamOutcome) -> Result<Response, ProxyError> {
    match outcome {
        UpstreamOutcome::Success(resp) => {
            let value: Value = resp.json().await?;
            Ok(Json(value).into_response())
        }
        UpstreamOutcome::Failure { status, body } => Err(ProxyError::Upstream { status, body }),
        UpstreamOutcome::TimedOut => Err(ProxyError::Timeout),
    }
}

async fn chat_completions_handler(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<Response, ProxyError> {
    // Validate the full shape, then forward the caller's body wholesale.
    let parsed: ChatProxyRequest = parse_body(body.clone())?;
    if parsed.chat_completion_request.messages.is_empty() {
        return Err(ProxyError::Validation(
            "chatCompletionRequest.messages must not be empty".to_string(),
        ));
    }

    match state.upstream.post_stream("/api/v1/chat/completions", &body).await? {
        UpstreamOutcome::Success(resp) => {
            let stream = resp.bytes_stream();
            Ok(Response::builder()
                .status(StatusCode::OK)
                .header(header::CONTENT_TYPE, "text/event-stream")
                .body(Body::from_stream(stream))
                .map_err(|e| ProxyError::Unexpected(e.to_string()))?)
        }
        UpstreamOutcome::Failure { status, body } => Err(ProxyError::Upstream { status, body }),
        UpstreamOutcome::TimedOut => Err(ProxyError::Timeout),
    }
}

async fn whale_transactions_handler(
    State(state): State<AppState>,
) -> Result<Response, ProxyError> {
    match state.upstream.get("/api/v1/whales/transactions").await? {
        UpstreamOutcome::Success(resp) => {
            let value: Value = resp.json().await?;
            Ok(Json(value).into_response())
        }
        UpstreamOutcome::Failure { status, .. } if status == StatusCode::NOT_FOUND => Ok((
            StatusCode::NOT_FOUND,
            Json(json!({ "error": WHALE_NOT_FOUND })),
        )
            .into_response()),
        UpstreamOutcome::Failure { status, body } => Err(ProxyError::Upstream { status, body }),
        UpstreamOutcome::TimedOut => Err(ProxyError::Timeout),
    }
}

async fn health_handler(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<Response, ProxyError> {
    let probe: HealthProbeRequest = parse_body(body)?;

    match state.upstream.get("/health").await? {
        UpstreamOutcome::Success(resp) => {
            let health_data: Value = resp.json().await?;
            Ok(Json(HealthProbeResponse {
                endpoint: probe.endpoint,
                method: probe.method,
                health_data,
            })
            .into_response())
        }
        UpstreamOutcome::Failure { status, body } => Err(ProxyError::Upstream { status, body }),
        UpstreamOutcome::TimedOut => Err(ProxyError::Timeout),
    }
}

async fn image_list_handler(State(state): State<AppState>) -> Result<Response, ProxyError> {
    relay_json(state.upstream.get("/api/v1/image/list").await?).await
}

async fn image_meme_handler(State(state): State<AppState>) -> Result<Response, ProxyError> {
    match state.upstream.get("/api/v1/image/meme").await? {
        UpstreamOutcome::Success(resp) => {
            let bytes = resp.bytes().await?;
            Ok(Response::builder()
                .status(StatusCode::OK)
                .header(header::CONTENT_TYPE, "image/webp")
                .body(Body::from(bytes))
                .map_err(|e| ProxyError::Unexpected(e.to_string()))?)
        }
        UpstreamOutcome::Failure { status, body } => Err(ProxyError::Upstream { status, body }),
        UpstreamOutcome::TimedOut => Err(ProxyError::Timeout),
    }
}

// Solana addresses are base58 and decode to a 32-byte public key.
fn is_valid_wallet_address(addr: &str) -> bool {
    matches!(bs58::decode(addr).into_vec(), Ok(bytes) if bytes.len() == 32)
}

async fn jupiter_balance_handler(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<Response, ProxyError> {
    let request: BalanceRequest = serde_json::from_value(body)
        .map_err(|_| ProxyError::Validation("Invalid wallet address".to_string()))?;
    if !is_valid_wallet_address(&request.wallet_address) {
        return Err(ProxyError::Validation("Invalid wallet address".to_string()));
    }

    let upstream_body = serde_json::to_value(UpstreamBalanceRequest {
        wallet: request.wallet_address,
    })
    .map_err(|e| ProxyError::Unexpected(e.to_string()))?;
    relay_json(
        state
            .upstream
            .post_json("/api/v1/jupiter/balance", &upstream_body)
            .await?,
    )
    .await
}

async fn jupiter_swap_handler(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<Response, ProxyError> {
    let request: SwapRequest = parse_body(body)?;

    let upstream_body =
        serde_json::to_value(&request).map_err(|e| ProxyError::Unexpected(e.to_string()))?;
    relay_json(
        state
            .upstream
            .post_json("/api/v1/jupiter/swap", &upstream_body)
            .await?,
    )
    .await
}

async fn tools_code_handler(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<Response, ProxyError> {
    let endpoint = body
        .get("endpoint")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ProxyError::Validation("Missing required field: endpoint".to_string()))?;

    // Everything except the routing field is passed through upstream.
    let mut payload = body;
    if let Some(map) = payload.as_object_mut() {
        map.remove("endpoint");
    }

    let path = format!("/api/v1/{}", endpoint.trim_start_matches('/'));
    relay_json(state.upstream.post_json(&path, &payload).await?).await
}

async fn tools_linksummary_handler(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<Response, ProxyError> {
    let request: LinkSummaryRequest = parse_body(body)?;

    let upstream_body =
        serde_json::to_value(&request).map_err(|e| ProxyError::Unexpected(e.to_string()))?;
    relay_json(
        state
            .upstream
            .post_json("/api/v1/summarize/url", &upstream_body)
            .await?,
    )
    .await
}

async fn giphy_handler(
    State(state): State<AppState>,
    Query(query): Query<GiphyQuery>,
) -> Result<Response, ProxyError> {
    let limit = query.limit.unwrap_or(10);
    match state.giphy.lookup(query.q.as_deref(), limit).await? {
        UpstreamOutcome::Success(resp) => {
            let value: Value = resp.json().await?;
            Ok(Json(value).into_response())
        }
        UpstreamOutcome::Failure { status, body } => {
            error!("giphy lookup failed with status {}", status);
            Err(ProxyError::Upstream { status, body })
        }
        UpstreamOutcome::TimedOut => Err(ProxyError::Timeout),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_base58_pubkey_passes() {
        // 32 bytes of zeros in base58.
        let addr = bs58::encode([0u8; 32]).into_string();
        assert!(is_valid_wallet_address(&addr));
    }

    #[test]
    fn short_or_non_base58_addresses_fail() {
        assert!(!is_valid_wallet_address("not-base58-0OIl"));
        assert!(!is_valid_wallet_address("abc"));
        assert!(!is_valid_wallet_address(""));
    }

    #[test]
    fn parse_body_reports_the_missing_field() {
        let err = parse_body::<SwapRequest>(json!({ "source": "SOL", "target": "USDC" }))
            .unwrap_err();
        assert!(err.to_string().contains("amount"));
    }

    #[test]
    fn parse_body_accepts_well_formed_input() {
        let req: SwapRequest =
            parse_body(json!({ "source": "SOL", "target": "USDC", "amount": 2.5 })).unwrap();
        assert_eq!(req.amount, 2.5);
    }
}
