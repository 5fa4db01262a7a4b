//! Test Utilities Module
//!
//! Provides an in-memory target service and scenario fixtures for unit tests.
//! This module is only compiled when running tests.

#![cfg(test)]

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::scenario::{ScenarioContext, ScenarioSettings, SetupState};
use crate::target::{Credentials, Endpoint, Reply, TargetError, TargetService, Transfer};

// ============================================================================
// Stub Target
// ============================================================================

/// Latency reported by every stub reply
pub const STUB_LATENCY: Duration = Duration::from_millis(2);

#[derive(Default)]
struct StubInner {
    failing_users: HashSet<String>,
    statuses: HashMap<Endpoint, u16>,
    calls: Mutex<HashMap<Endpoint, usize>>,
    auth_users: Mutex<Vec<String>>,
    tokens: Mutex<Vec<String>>,
    transfers: Mutex<Vec<(String, Transfer)>>,
    items: Mutex<Vec<String>>,
}

/// In-memory target service that records every call.
///
/// Auth hands out `token-{username}`; every other endpoint replies 200 unless
/// overridden with [`StubTarget::with_status`].
#[derive(Clone, Default)]
pub struct StubTarget {
    inner: Arc<StubInner>,
}

impl StubTarget {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject logins for these usernames with 401. Call before cloning.
    pub fn failing_auth<I, S>(mut self, users: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let inner = Arc::get_mut(&mut self.inner).expect("configure StubTarget before cloning");
        inner.failing_users.extend(users.into_iter().map(Into::into));
        self
    }

    /// Reply with `status` on every call to `endpoint`. Call before cloning.
    pub fn with_status(mut self, endpoint: Endpoint, status: u16) -> Self {
        let inner = Arc::get_mut(&mut self.inner).expect("configure StubTarget before cloning");
        inner.statuses.insert(endpoint, status);
        self
    }

    pub fn calls(&self, endpoint: Endpoint) -> usize {
        self.inner
            .calls
            .lock()
            .unwrap()
            .get(&endpoint)
            .copied()
            .unwrap_or(0)
    }

    pub fn last_auth_user(&self) -> Option<String> {
        self.inner.auth_users.lock().unwrap().last().cloned()
    }

    /// Bearer tokens presented to authenticated endpoints, in call order
    pub fn tokens_used(&self) -> Vec<String> {
        self.inner.tokens.lock().unwrap().clone()
    }

    /// `(sender token, transfer)` for every `sendCoin` call
    pub fn transfers(&self) -> Vec<(String, Transfer)> {
        self.inner.transfers.lock().unwrap().clone()
    }

    pub fn items_bought(&self) -> Vec<String> {
        self.inner.items.lock().unwrap().clone()
    }

    fn called(&self, endpoint: Endpoint, token: Option<&str>) -> Reply {
        *self.inner.calls.lock().unwrap().entry(endpoint).or_default() += 1;
        if let Some(token) = token {
            self.inner.tokens.lock().unwrap().push(token.to_string());
        }

        match self.inner.statuses.get(&endpoint) {
            Some(&status) if status != 200 => Reply::new(
                status,
                STUB_LATENCY,
                format!(r#"{{"errors":"stub status {}"}}"#, status),
            ),
            _ => Reply::new(200, STUB_LATENCY, "{}"),
        }
    }
}

#[async_trait]
impl TargetService for StubTarget {
    async fn auth(&self, credentials: &Credentials) -> Result<Reply, TargetError> {
        let reply = self.called(Endpoint::Auth, None);
        self.inner
            .auth_users
            .lock()
            .unwrap()
            .push(credentials.username.clone());

        if self.inner.failing_users.contains(&credentials.username) {
            return Ok(Reply::new(
                401,
                STUB_LATENCY,
                r#"{"errors":"invalid credentials"}"#,
            ));
        }
        if reply.status != 200 {
            return Ok(reply);
        }
        Ok(Reply::new(
            200,
            STUB_LATENCY,
            format!(r#"{{"token":"token-{}"}}"#, credentials.username),
        ))
    }

    async fn info(&self, token: &str) -> Result<Reply, TargetError> {
        Ok(self.called(Endpoint::Info, Some(token)))
    }

    async fn send_coin(&self, token: &str, transfer: &Transfer) -> Result<Reply, TargetError> {
        self.inner
            .transfers
            .lock()
            .unwrap()
            .push((token.to_string(), transfer.clone()));
        Ok(self.called(Endpoint::SendCoin, Some(token)))
    }

    async fn buy(&self, token: &str, item: &str) -> Result<Reply, TargetError> {
        self.inner.items.lock().unwrap().push(item.to_string());
        Ok(self.called(Endpoint::Buy, Some(token)))
    }
}

// ============================================================================
// Scenario Fixtures
// ============================================================================

/// Setup state with `user0..user{n-1}` holding `token-userN`
pub fn state_with(n: usize) -> SetupState {
    SetupState::from_tokens((0..n).map(|i| (format!("user{}", i), format!("token-user{}", i))))
}

pub fn context(target: StubTarget, state: SetupState) -> ScenarioContext {
    context_with_settings(target, state, ScenarioSettings::default())
}

pub fn context_with_settings(
    target: StubTarget,
    state: SetupState,
    settings: ScenarioSettings,
) -> ScenarioContext {
    ScenarioContext {
        target: Arc::new(target),
        state: Arc::new(state),
        settings: Arc::new(settings),
    }
}

// ============================================================================
// Tests for Test Utilities
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::AuthResponse;

    #[tokio::test]
    async fn test_stub_auth_hands_out_tokens() {
        let target = StubTarget::new().failing_auth(["bob"]);

        let ok = target.auth(&Credentials::new("alice", "pw")).await.unwrap();
        assert_eq!(ok.status, 200);
        assert_eq!(ok.json::<AuthResponse>().unwrap().token, "token-alice");

        let denied = target.auth(&Credentials::new("bob", "pw")).await.unwrap();
        assert_eq!(denied.status, 401);
        assert_eq!(denied.error_message().as_deref(), Some("invalid credentials"));

        assert_eq!(target.calls(Endpoint::Auth), 2);
    }

    #[tokio::test]
    async fn test_stub_status_override() {
        let target = StubTarget::new().with_status(Endpoint::Buy, 400);

        assert_eq!(target.buy("t", "pen").await.unwrap().status, 400);
        assert_eq!(target.info("t").await.unwrap().status, 200);
        assert_eq!(target.tokens_used(), vec!["t", "t"]);
    }

    #[test]
    fn test_state_with() {
        let state = state_with(3);
        assert_eq!(state.len(), 3);
        assert_eq!(state.token("user2"), Some("token-user2"));
    }
}
