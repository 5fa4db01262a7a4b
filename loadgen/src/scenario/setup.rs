//! Setup provider: provisions authenticated identities before load begins

use indexmap::IndexMap;
use rand::Rng;
use serde::Serialize;
use tracing::{info, warn};

use super::types::{CheckResult, RequestSample, ScenarioRng};
use crate::stats::MetricsCollector;
use crate::target::{AuthResponse, Credentials, Endpoint, TargetService};

/// Scenario tag used for checks recorded during setup
pub const SETUP_SCENARIO: &str = "setup";

/// Check recorded once per provisioning request
pub const SETUP_CHECK: &str = "auth success";

/// Identities provisioned during setup: username -> bearer token.
///
/// Built once, then shared read-only by every virtual client. Iteration order is the
/// provisioning order, so seeded selection is reproducible.
#[derive(Debug, Clone, Default)]
pub struct SetupState {
    tokens: IndexMap<String, String>,
}

impl SetupState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_tokens<I, U, T>(tokens: I) -> Self
    where
        I: IntoIterator<Item = (U, T)>,
        U: Into<String>,
        T: Into<String>,
    {
        Self {
            tokens: tokens
                .into_iter()
                .map(|(u, t)| (u.into(), t.into()))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn token(&self, username: &str) -> Option<&str> {
        self.tokens.get(username).map(String::as_str)
    }

    pub fn usernames(&self) -> impl Iterator<Item = &str> {
        self.tokens.keys().map(String::as_str)
    }

    /// `(username, token)` at a provisioning position
    pub fn identity(&self, index: usize) -> Option<(&str, &str)> {
        self.tokens
            .get_index(index)
            .map(|(u, t)| (u.as_str(), t.as_str()))
    }

    /// Uniformly random `(username, token)`, or `None` when nothing was provisioned
    pub fn random_identity(&self, rng: &mut ScenarioRng) -> Option<(&str, &str)> {
        if self.tokens.is_empty() {
            return None;
        }
        self.identity(rng.random_range(0..self.tokens.len()))
    }

    /// Uniformly random token
    pub fn random_token(&self, rng: &mut ScenarioRng) -> Option<&str> {
        self.random_identity(rng).map(|(_, token)| token)
    }
}

/// Synthetic identities to provision: `{prefix}0` .. `{prefix}{count-1}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityPlan {
    pub prefix: String,
    pub count: usize,
    pub password: String,
}

impl Default for IdentityPlan {
    fn default() -> Self {
        Self {
            prefix: "user".to_string(),
            count: 100,
            password: "password123".to_string(),
        }
    }
}

impl IdentityPlan {
    pub fn credentials(&self) -> impl Iterator<Item = Credentials> + '_ {
        (0..self.count).map(|i| Credentials::new(format!("{}{}", self.prefix, i), &self.password))
    }
}

/// What setup achieved
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SetupReport {
    pub requested: usize,
    pub provisioned: usize,
    /// Usernames that got no token
    pub failed: Vec<String>,
}

/// Runs once before any virtual client is spawned
#[derive(Debug, Clone, Default)]
pub struct SetupProvider {
    plan: IdentityPlan,
}

impl SetupProvider {
    pub fn new(plan: IdentityPlan) -> Self {
        Self { plan }
    }

    /// Authenticate every planned identity in order.
    ///
    /// A failed provisioning request leaves that identity out of the state; setup as a
    /// whole never fails.
    pub async fn provision(
        &self,
        target: &dyn TargetService,
        collector: &MetricsCollector,
    ) -> (SetupState, SetupReport) {
        let mut tokens = IndexMap::with_capacity(self.plan.count);
        let mut failed = Vec::new();

        for credentials in self.plan.credentials() {
            let result = target.auth(&credentials).await;
            collector.record_setup_request(&RequestSample::from_result(Endpoint::Auth, &result));

            let token = match &result {
                Ok(reply) if reply.status == 200 => match reply.json::<AuthResponse>() {
                    Ok(auth) if !auth.token.is_empty() => Some(auth.token),
                    Ok(_) => {
                        warn!("Auth for {} returned an empty token", credentials.username);
                        None
                    }
                    Err(e) => {
                        warn!("Auth for {} returned an unreadable body: {}", credentials.username, e);
                        None
                    }
                },
                Ok(reply) => {
                    warn!(
                        "Auth for {} failed with status {}: {}",
                        credentials.username,
                        reply.status,
                        reply.error_message().unwrap_or_default()
                    );
                    None
                }
                Err(e) => {
                    warn!("Auth for {} failed: {}", credentials.username, e);
                    None
                }
            };

            collector.record_check(&CheckResult::new(SETUP_SCENARIO, SETUP_CHECK, token.is_some()));

            match token {
                Some(token) => {
                    tokens.insert(credentials.username, token);
                }
                None => failed.push(credentials.username),
            }
        }

        let report = SetupReport {
            requested: self.plan.count,
            provisioned: tokens.len(),
            failed,
        };
        info!(
            "Setup provisioned {}/{} identities",
            report.provisioned, report.requested
        );

        (SetupState { tokens }, report)
    }
}
