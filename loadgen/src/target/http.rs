//! reqwest-backed implementation of the target service

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Url};
use std::time::{Duration, Instant};
use tracing::debug;

use super::service::TargetService;
use super::types::{Credentials, Endpoint, Reply, TargetError, Transfer};

/// Target service reached over HTTP
#[derive(Debug, Clone)]
pub struct HttpTarget {
    client: Client,
    base: Url,
}

impl HttpTarget {
    /// Create a target rooted at `base_url` with a per-request timeout
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, TargetError> {
        let client = Client::builder()
            .pool_max_idle_per_host(1024)
            .timeout(timeout)
            .build()
            .map_err(TargetError::Client)?;

        let base = Url::parse(base_url)
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .ok_or_else(|| TargetError::InvalidBaseUrl(base_url.to_string()))?;

        Ok(Self { client, base })
    }

    pub fn base_url(&self) -> &str {
        self.base.as_str().trim_end_matches('/')
    }

    /// Base URL extended by `segments`, each percent-encoded as one path segment
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn execute(&self, endpoint: Endpoint, request: RequestBuilder) -> Result<Reply, TargetError> {
        let start = Instant::now();

        let response = request
            .send()
            .await
            .map_err(|e| classify(endpoint, start.elapsed(), e))?;
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| classify(endpoint, start.elapsed(), e))?;

        let reply = Reply::new(status, start.elapsed(), body);
        if !reply.is_success() {
            debug!(
                "{} replied {}: {}",
                endpoint,
                status,
                reply.error_message().unwrap_or_default()
            );
        }
        Ok(reply)
    }
}

fn classify(endpoint: Endpoint, elapsed: Duration, error: reqwest::Error) -> TargetError {
    if error.is_timeout() {
        TargetError::Timeout { endpoint, elapsed }
    } else {
        TargetError::Transport {
            endpoint,
            elapsed,
            source: error,
        }
    }
}

#[async_trait]
impl TargetService for HttpTarget {
    async fn auth(&self, credentials: &Credentials) -> Result<Reply, TargetError> {
        let request = self.client.post(self.url(&["api", "auth"])).json(credentials);
        self.execute(Endpoint::Auth, request).await
    }

    async fn info(&self, token: &str) -> Result<Reply, TargetError> {
        let request = self.client.get(self.url(&["api", "info"])).bearer_auth(token);
        self.execute(Endpoint::Info, request).await
    }

    async fn send_coin(&self, token: &str, transfer: &Transfer) -> Result<Reply, TargetError> {
        let request = self
            .client
            .post(self.url(&["api", "sendCoin"]))
            .bearer_auth(token)
            .json(transfer);
        self.execute(Endpoint::SendCoin, request).await
    }

    async fn buy(&self, token: &str, item: &str) -> Result<Reply, TargetError> {
        let request = self
            .client
            .get(self.url(&["api", "buy", item]))
            .bearer_auth(token);
        self.execute(Endpoint::Buy, request).await
    }
}
