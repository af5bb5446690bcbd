//! Network transports for the fetch pipeline.
//!
//! [`DirectTransport`] talks to the provider. [`PassthroughTransport`]
//! relays through an external proxy (`{base}?url=<target>`) and is tried
//! once when the direct path fails before any HTTP status is received.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use url::Url;

use crate::error::{AppError, AppResult};

/// A received HTTP response, any status.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: String,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// The request produced no HTTP status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportFailure {
    pub message: String,
    /// Connection-level failure, the native analogue of a browser CORS block
    pub cors_suspected: bool,
}

impl TransportFailure {
    fn from_reqwest(e: &reqwest::Error) -> Self {
        let cors_suspected = !e.is_timeout() && !e.is_builder() && (e.is_connect() || e.is_request());
        Self { message: e.to_string(), cors_suspected }
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Short label used in logs.
    fn name(&self) -> &'static str;

    async fn get(&self, url: &Url, headers: &[(String, String)]) -> Result<TransportResponse, TransportFailure>;
}

/// Build the shared HTTP client.
pub fn build_http_client(timeout: Duration) -> AppResult<reqwest::Client> {
    let client = reqwest::Client::builder()
        .timeout(timeout)
        .tcp_nodelay(true)
        .user_agent(concat!("finboard/", env!("CARGO_PKG_VERSION")))
        .build()?;
    Ok(client)
}

async fn send(
    client: &reqwest::Client,
    url: Url,
    headers: &[(String, String)],
) -> Result<TransportResponse, TransportFailure> {
    // GET without Content-Type; only caller-supplied headers are attached.
    let mut request = client.get(url);
    for (name, value) in headers {
        request = request.header(name.as_str(), value.as_str());
    }

    let response = request.send().await.map_err(|e| TransportFailure::from_reqwest(&e))?;
    let status = response.status().as_u16();
    let headers = response.headers().clone();
    let body = response
        .text()
        .await
        .map_err(|e| TransportFailure { message: e.to_string(), cors_suspected: false })?;

    Ok(TransportResponse { status, headers, body })
}

#[derive(Debug, Clone)]
pub struct DirectTransport {
    client: reqwest::Client,
}

impl DirectTransport {
    pub fn new(timeout: Duration) -> AppResult<Self> {
        Ok(Self { client: build_http_client(timeout)? })
    }
}

#[async_trait]
impl Transport for DirectTransport {
    fn name(&self) -> &'static str {
        "direct"
    }

    async fn get(&self, url: &Url, headers: &[(String, String)]) -> Result<TransportResponse, TransportFailure> {
        send(&self.client, url.clone(), headers).await
    }
}

#[derive(Debug, Clone)]
pub struct PassthroughTransport {
    client: reqwest::Client,
    base: Url,
}

impl PassthroughTransport {
    pub fn new(base: &str, timeout: Duration) -> AppResult<Self> {
        Ok(Self { client: build_http_client(timeout)?, base: parse_http_url(base)? })
    }

    /// `{base}?url=<percent-encoded target>`
    pub fn relay_url(&self, target: &Url) -> Url {
        let mut relay = self.base.clone();
        relay.query_pairs_mut().append_pair("url", target.as_str());
        relay
    }
}

#[async_trait]
impl Transport for PassthroughTransport {
    fn name(&self) -> &'static str {
        "passthrough"
    }

    async fn get(&self, url: &Url, headers: &[(String, String)]) -> Result<TransportResponse, TransportFailure> {
        send(&self.client, self.relay_url(url), headers).await
    }
}

/// Parse `raw` and require an http(s) scheme with a host.
pub fn parse_http_url(raw: &str) -> AppResult<Url> {
    let invalid = |reason: String| AppError::InvalidUrl { url: raw.to_string(), reason };
    let url = Url::parse(raw.trim()).map_err(|e| invalid(e.to_string()))?;
    match url.scheme() {
        "http" | "https" if url.has_host() => Ok(url),
        "http" | "https" => Err(invalid("missing host".to_string())),
        other => Err(invalid(format!("unsupported scheme '{}'", other))),
    }
}
