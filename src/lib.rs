pub mod chat;
pub mod cli;
pub mod config;
pub mod error;
pub mod models;
pub mod server;
pub mod upstream;

use cli::Args;
use config::ProxyConfig;
use log::info;
use server::Server;
use std::error::Error;
use std::sync::Arc;

pub async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    info!("--- Core Configuration ---");
    info!("Server Address: {}", args.server_addr);
    info!("Upstream Base URL: {}", args.api_base_url);
    info!("Upstream Token Set: {}", !args.api_key.is_empty());
    info!("Upstream Timeout: {}s", args.upstream_timeout_secs);
    info!("Giphy Key Set: {}", !args.giphy_api_key.is_empty());
    info!("-------------------------");

    let config = Arc::new(ProxyConfig::from_args(&args));
    let server = Server::new(args.server_addr.clone(), config);
    server.run().await?;

    Ok(())
}
