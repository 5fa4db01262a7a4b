//! `auth` scenario: log in as one fixed identity

use async_trait::async_trait;

use super::types::{Iteration, Scenario, ScenarioContext, ScenarioError, ScenarioRng};
use crate::target::Endpoint;

pub const NAME: &str = "auth";
const CHECK: &str = "auth status is 200";

#[derive(Debug, Clone, Copy, Default)]
pub struct AuthScenario;

#[async_trait]
impl Scenario for AuthScenario {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn execute(
        &self,
        ctx: &ScenarioContext,
        _rng: &mut ScenarioRng,
    ) -> Result<Iteration, ScenarioError> {
        let result = ctx.target.auth(&ctx.settings.auth_user).await;
        Ok(Iteration::status_check(NAME, CHECK, Endpoint::Auth, result))
    }
}
