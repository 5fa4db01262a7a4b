//! Target request/reply types and error definitions

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while talking to the target service
#[derive(Debug, Error)]
pub enum TargetError {
    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("Invalid target base URL '{0}'")]
    InvalidBaseUrl(String),

    #[error("Request to {endpoint} failed after {elapsed:?}: {source}")]
    Transport {
        endpoint: Endpoint,
        elapsed: Duration,
        #[source]
        source: reqwest::Error,
    },

    #[error("Request to {endpoint} timed out after {elapsed:?}")]
    Timeout { endpoint: Endpoint, elapsed: Duration },
}

impl TargetError {
    /// Time spent on the request before it failed, if one was sent
    pub fn elapsed(&self) -> Option<Duration> {
        match self {
            TargetError::Transport { elapsed, .. } | TargetError::Timeout { elapsed, .. } => {
                Some(*elapsed)
            }
            TargetError::Client(_) | TargetError::InvalidBaseUrl(_) => None,
        }
    }
}

/// Endpoints of the service under test
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Endpoint {
    Auth,
    Info,
    SendCoin,
    Buy,
}

impl Endpoint {
    pub fn name(&self) -> &'static str {
        match self {
            Endpoint::Auth => "auth",
            Endpoint::Info => "info",
            Endpoint::SendCoin => "sendCoin",
            Endpoint::Buy => "buy",
        }
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Body of `POST /api/auth`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

/// Successful reply of `POST /api/auth`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
}

/// Body of `POST /api/sendCoin`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transfer {
    pub to_user: String,
    pub amount: u64,
}

/// Error body rendered by the target service for non-2xx replies
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub errors: String,
}

/// A completed exchange with the target service
#[derive(Debug, Clone)]
pub struct Reply {
    pub status: u16,
    /// Time from sending the request until the body was fully read
    pub latency: Duration,
    pub body: Bytes,
}

impl Reply {
    pub fn new(status: u16, latency: Duration, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            latency,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Whether the exchange counts as a failed request (4xx/5xx)
    pub fn is_failure(&self) -> bool {
        self.status >= 400
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }

    /// The `errors` message of an error body, if the target rendered one
    pub fn error_message(&self) -> Option<String> {
        self.json::<ErrorResponse>().ok().map(|e| e.errors)
    }
}
