//! TargetService trait definition

use async_trait::async_trait;

use super::types::{Credentials, Reply, TargetError, Transfer};

/// The HTTP surface of the service under test.
///
/// Implementations return `Ok` for every exchange that produced a status code,
/// including 4xx/5xx; `Err` is reserved for transport failures and timeouts.
#[async_trait]
pub trait TargetService: Send + Sync {
    /// `POST /api/auth`
    async fn auth(&self, credentials: &Credentials) -> Result<Reply, TargetError>;

    /// `GET /api/info`
    async fn info(&self, token: &str) -> Result<Reply, TargetError>;

    /// `POST /api/sendCoin`
    async fn send_coin(&self, token: &str, transfer: &Transfer) -> Result<Reply, TargetError>;

    /// `GET /api/buy/{item}`
    async fn buy(&self, token: &str, item: &str) -> Result<Reply, TargetError>;
}
