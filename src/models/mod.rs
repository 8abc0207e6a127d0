pub mod chat;

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WhaleTransaction {
    pub transaction_hash: String,
    pub amount_tokens: f64,
    pub amount_usd: f64,
    pub price_usd: f64,
    pub timestamp: i64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HealthProbeRequest {
    pub endpoint: String,
    pub method: String,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthProbeResponse {
    pub endpoint: String,
    pub method: String,
    pub health_data: serde_json::Value,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceRequest {
    pub wallet_address: String,
}

/// Upstream expects the field renamed to `wallet`.
#[derive(Clone, Debug, Serialize)]
pub struct UpstreamBalanceRequest {
    pub wallet: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SwapRequest {
    pub source: String,
    pub target: String,
    pub amount: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LinkSummaryRequest {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u32>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct GiphyQuery {
    pub q: Option<String>,
    pub limit: Option<u32>,
}
