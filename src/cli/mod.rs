use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    // --- Server Args ---
    /// Host address and port for the proxy server to listen on.
    #[arg(long, env = "SERVER_ADDR", default_value = "127.0.0.1:4000")]
    pub server_addr: String,

    // --- Upstream Args ---
    /// Base URL of the upstream agent API (e.g., https://api.example.com)
    #[arg(long, env = "API_BASE_URL", default_value = "")]
    pub api_base_url: String,

    /// Bearer token for the upstream agent API.
    #[arg(long, env = "API_KEY", default_value = "")]
    pub api_key: String,

    /// Timeout in seconds applied to bounded upstream calls.
    #[arg(long, env = "UPSTREAM_TIMEOUT_SECS", default_value = "5")]
    pub upstream_timeout_secs: u64,

    // --- Third-Party Args ---
    /// API key for the Giphy search/trending API.
    #[arg(long, env = "GIPHY_API_KEY", default_value = "")]
    pub giphy_api_key: String,

    /// Base URL for the Giphy API.
    #[arg(long, env = "GIPHY_BASE_URL", default_value = "https://api.giphy.com/v1/gifs")]
    pub giphy_base_url: String,

    // --- General App Args ---
    /// Enable debug logging/output
    #[arg(long, env = "DEBUG", default_value = "false")]
    pub debug: bool,
}
