pub mod api;

use std::error::Error;
use std::sync::Arc;

use log::info;

use crate::config::ProxyConfig;
use crate::upstream::{GiphyClient, UpstreamClient};

pub struct Server {
    addr: String,
    config: Arc<ProxyConfig>,
}

impl Server {
    pub fn new(addr: String, config: Arc<ProxyConfig>) -> Self {
        Self { addr, config }
    }

    pub async fn run(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        let state = api::AppState {
            upstream: Arc::new(UpstreamClient::new(&self.config)),
            giphy: Arc::new(GiphyClient::new(&self.config)),
        };
        let app = api::router(state);

        let listener = tokio::net::TcpListener::bind(&self.addr).await?;
        info!("Proxy server listening on: http://{}", self.addr);
        axum::serve(listener, app.into_make_service()).await?;
        Ok(())
    }
}
