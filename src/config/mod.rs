use std::time::Duration;

use crate::cli::Args;

/// Read-only process configuration, built once from [`Args`] at startup and
/// shared by reference. Nothing in here is mutated after construction.
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    pub api_base_url: String,
    pub api_key: String,
    pub upstream_timeout: Duration,
    pub giphy_api_key: String,
    pub giphy_base_url: String,
}

impl ProxyConfig {
    pub fn from_args(args: &Args) -> Self {
        Self {
            api_base_url: args.api_base_url.trim_end_matches('/').to_string(),
            api_key: args.api_key.clone(),
            upstream_timeout: Duration::from_secs(args.upstream_timeout_secs),
            giphy_api_key: args.giphy_api_key.clone(),
            giphy_base_url: args.giphy_base_url.trim_end_matches('/').to_string(),
        }
    }
}
