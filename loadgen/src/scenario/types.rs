//! Scenario outcome types, context and error definitions

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use super::setup::SetupState;
use crate::target::{Credentials, Endpoint, Reply, TargetError, TargetService};

/// Seedable random source handed to every scenario invocation
pub type ScenarioRng = ChaCha8Rng;

/// Preconditions a scenario cannot meet. These are configuration errors and stop the run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScenarioError {
    #[error("Scenario '{scenario}' has no provisioned identity to take a token from")]
    NoIdentities { scenario: &'static str },

    #[error(
        "Scenario '{scenario}' needs at least {required} provisioned identities, found {available}"
    )]
    InsufficientIdentities {
        scenario: &'static str,
        required: usize,
        available: usize,
    },

    #[error("Scenario '{scenario}' has an empty item catalog")]
    EmptyCatalog { scenario: &'static str },
}

/// A named boolean assertion evaluated against one response
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckResult {
    pub name: &'static str,
    pub scenario: &'static str,
    pub passed: bool,
    pub at: DateTime<Utc>,
}

impl CheckResult {
    pub fn new(scenario: &'static str, name: &'static str, passed: bool) -> Self {
        Self {
            name,
            scenario,
            passed,
            at: Utc::now(),
        }
    }
}

/// Outcome of one request issued by a scenario
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestSample {
    pub endpoint: Endpoint,
    /// `None` when the request never produced a status (transport error, timeout)
    pub status: Option<u16>,
    /// Time until the reply was read or the request failed; `None` if nothing was sent
    pub latency: Option<Duration>,
    pub failed: bool,
}

impl RequestSample {
    pub fn from_result(endpoint: Endpoint, result: &Result<Reply, TargetError>) -> Self {
        match result {
            Ok(reply) => Self {
                endpoint,
                status: Some(reply.status),
                latency: Some(reply.latency),
                failed: reply.is_failure(),
            },
            Err(e) => Self {
                endpoint,
                status: None,
                latency: e.elapsed(),
                failed: true,
            },
        }
    }
}

/// Everything one scenario invocation reports back
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Iteration {
    pub checks: Vec<CheckResult>,
    pub requests: Vec<RequestSample>,
}

impl Iteration {
    /// One request with a single "status is 200" style check
    pub fn status_check(
        scenario: &'static str,
        check: &'static str,
        endpoint: Endpoint,
        result: Result<Reply, TargetError>,
    ) -> Self {
        if let Err(ref e) = result {
            tracing::debug!("{} request failed: {}", scenario, e);
        }

        let passed = matches!(result, Ok(ref reply) if reply.status == 200);
        Self {
            checks: vec![CheckResult::new(scenario, check, passed)],
            requests: vec![RequestSample::from_result(endpoint, &result)],
        }
    }

    pub fn passed(&self) -> bool {
        self.checks.iter().all(|c| c.passed)
    }
}

/// Fixed data the scenarios draw from
#[derive(Debug, Clone)]
pub struct ScenarioSettings {
    /// Identity used by the `auth` scenario
    pub auth_user: Credentials,
    /// Coins moved per `sendCoin` request
    pub transfer_amount: u64,
    /// Items the `buy` scenario picks from
    pub catalog: Vec<String>,
}

impl Default for ScenarioSettings {
    fn default() -> Self {
        Self {
            auth_user: Credentials::new("user1", "password123"),
            transfer_amount: 1,
            catalog: vec!["pen".to_string(), "socks".to_string(), "cup".to_string()],
        }
    }
}

/// Shared inputs of a scenario invocation; cheap to clone per virtual client
#[derive(Clone)]
pub struct ScenarioContext {
    pub target: Arc<dyn TargetService>,
    pub state: Arc<SetupState>,
    pub settings: Arc<ScenarioSettings>,
}

/// A scenario function: one pass of requests and checks against the target
#[async_trait]
pub trait Scenario: Send + Sync {
    fn name(&self) -> &'static str;

    /// Validate that the scenario can run at all with this setup state.
    ///
    /// Called once before any virtual client starts.
    fn check_preconditions(
        &self,
        _state: &SetupState,
        _settings: &ScenarioSettings,
    ) -> Result<(), ScenarioError> {
        Ok(())
    }

    async fn execute(
        &self,
        ctx: &ScenarioContext,
        rng: &mut ScenarioRng,
    ) -> Result<Iteration, ScenarioError>;
}
