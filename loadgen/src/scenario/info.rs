//! `info` scenario: authenticated read with a random provisioned token

use async_trait::async_trait;

use super::setup::SetupState;
use super::types::{
    Iteration, Scenario, ScenarioContext, ScenarioError, ScenarioRng, ScenarioSettings,
};
use crate::target::Endpoint;

pub const NAME: &str = "info";
const CHECK: &str = "info status is 200";

#[derive(Debug, Clone, Copy, Default)]
pub struct InfoScenario;

#[async_trait]
impl Scenario for InfoScenario {
    fn name(&self) -> &'static str {
        NAME
    }

    fn check_preconditions(
        &self,
        state: &SetupState,
        _settings: &ScenarioSettings,
    ) -> Result<(), ScenarioError> {
        if state.is_empty() {
            return Err(ScenarioError::NoIdentities { scenario: NAME });
        }
        Ok(())
    }

    async fn execute(
        &self,
        ctx: &ScenarioContext,
        rng: &mut ScenarioRng,
    ) -> Result<Iteration, ScenarioError> {
        let token = ctx
            .state
            .random_token(rng)
            .ok_or(ScenarioError::NoIdentities { scenario: NAME })?;

        let result = ctx.target.info(token).await;
        Ok(Iteration::status_check(NAME, CHECK, Endpoint::Info, result))
    }
}
