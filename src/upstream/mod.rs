use std::time::Duration;

use log::{error, info};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client as HttpClient, Method, Response, StatusCode};
use url::Url;

use crate::config::ProxyConfig;
use crate::error::ProxyError;

/// Tagged result of one bounded upstream call.
#[derive(Debug)]
pub enum UpstreamOutcome {
    Success(Response),
    Failure { status: StatusCode, body: String },
    TimedOut,
}

/// Stateless forwarder to the upstream agent API. Holds only the read-only
/// configuration (base URL, bearer token, deadline) captured at construction.
pub struct UpstreamClient {
    http: HttpClient,
    base_url: String,
    api_key: String,
    timeout: Duration,
}

impl UpstreamClient {
    pub fn new(config: &ProxyConfig) -> Self {
        Self {
            http: HttpClient::new(),
            base_url: config.api_base_url.clone(),
            api_key: config.api_key.clone(),
            timeout: config.upstream_timeout,
        }
    }

    // Configuration is checked on every call, before any network I/O.
    fn ensure_configured(&self) -> Result<(), ProxyError> {
        if self.base_url.is_empty() {
            return Err(ProxyError::Config("API_BASE_URL is not set".to_string()));
        }
        if self.api_key.is_empty() {
            return Err(ProxyError::Config("API_KEY is not set".to_string()));
        }
        Ok(())
    }

    fn endpoint(&self, path: &str) -> Result<Url, ProxyError> {
        let joined = format!("{}{}", self.base_url.trim_end_matches('/'), path);
        Url::parse(&joined)
            .map_err(|e| ProxyError::Config(format!("invalid upstream URL {}: {}", joined, e)))
    }

    fn auth_headers(&self) -> Result<HeaderMap, ProxyError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.api_key))
                .map_err(|e| ProxyError::Config(format!("invalid API key: {}", e)))?,
        );
        Ok(headers)
    }

    pub async fn get(&self, path: &str) -> Result<UpstreamOutcome, ProxyError> {
        self.call(Method::GET, path, None).await
    }

    pub async fn post_json(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<UpstreamOutcome, ProxyError> {
        self.call(Method::POST, path, Some(body)).await
    }

    // One reusable bounded call: the request races a deadline timer; if the
    // timer fires first the in-flight call is dropped and TimedOut returned.
    async fn call(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<UpstreamOutcome, ProxyError> {
        self.ensure_configured()?;
        let url = self.endpoint(path)?;
        info!("forwarding {} {}", method, url);

        let mut req = self.http.request(method, url).headers(self.auth_headers()?);
        if let Some(body) = body {
            req = req.json(body);
        }

        let resp = match tokio::time::timeout(self.timeout, req.send()).await {
            Ok(Ok(resp)) => resp,
            Ok(Err(e)) => {
                error!("upstream call failed: {}", e);
                return Err(ProxyError::Transport(e));
            }
            Err(_) => return Ok(UpstreamOutcome::TimedOut),
        };

        let status = resp.status();
        if !status.is_success() {
            let body = match tokio::time::timeout(self.timeout, resp.text()).await {
                Ok(Ok(text)) => text,
                Ok(Err(_)) | Err(_) => String::new(),
            };
            return Ok(UpstreamOutcome::Failure { status, body });
        }
        Ok(UpstreamOutcome::Success(resp))
    }

    /// Streaming POST. The deadline bounds the send/await-headers phase only:
    /// a healthy stream may legitimately outlive any fixed timeout.
    pub async fn post_stream(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<UpstreamOutcome, ProxyError> {
        self.ensure_configured()?;
        let url = self.endpoint(path)?;
        info!("forwarding streaming POST {}", url);

        let req = self.http.post(url).headers(self.auth_headers()?).json(body);
        let resp = match tokio::time::timeout(self.timeout, req.send()).await {
            Ok(Ok(resp)) => resp,
            Ok(Err(e)) => {
                error!("upstream streaming call failed: {}", e);
                return Err(ProxyError::Transport(e));
            }
            Err(_) => return Ok(UpstreamOutcome::TimedOut),
        };

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Ok(UpstreamOutcome::Failure { status, body });
        }
        Ok(UpstreamOutcome::Success(resp))
    }
}

/// Thin client for the third-party GIF API; the key never leaves the server.
pub struct GiphyClient {
    http: HttpClient,
    base_url: String,
    api_key: String,
    timeout: Duration,
}

impl GiphyClient {
    pub fn new(config: &ProxyConfig) -> Self {
        Self {
            http: HttpClient::new(),
            base_url: config.giphy_base_url.clone(),
            api_key: config.giphy_api_key.clone(),
            timeout: config.upstream_timeout,
        }
    }

    /// Searches when a query is given, otherwise returns trending GIFs.
    pub async fn lookup(
        &self,
        query: Option<&str>,
        limit: u32,
    ) -> Result<UpstreamOutcome, ProxyError> {
        if self.api_key.is_empty() {
            return Err(ProxyError::Config("GIPHY_API_KEY is not set".to_string()));
        }

        let mut url = match query {
            Some(_) => Url::parse(&format!("{}/search", self.base_url)),
            None => Url::parse(&format!("{}/trending", self.base_url)),
        }
        .map_err(|e| ProxyError::Config(format!("invalid Giphy URL: {}", e)))?;

        url.query_pairs_mut()
            .append_pair("api_key", &self.api_key)
            .append_pair("limit", &limit.to_string());
        if let Some(q) = query {
            url.query_pairs_mut().append_pair("q", q);
        }

        let resp = match tokio::time::timeout(self.timeout, self.http.get(url).send()).await {
            Ok(Ok(resp)) => resp,
            Ok(Err(e)) => return Err(ProxyError::Transport(e)),
            Err(_) => return Ok(UpstreamOutcome::TimedOut),
        };

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Ok(UpstreamOutcome::Failure { status, body });
        }
        Ok(UpstreamOutcome::Success(resp))
    }
}
