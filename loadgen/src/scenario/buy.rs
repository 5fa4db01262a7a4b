//! `buy` scenario: purchase a random catalog item with a random token

use async_trait::async_trait;
use rand::seq::IndexedRandom;

use super::setup::SetupState;
use super::types::{
    Iteration, Scenario, ScenarioContext, ScenarioError, ScenarioRng, ScenarioSettings,
};
use crate::target::Endpoint;

pub const NAME: &str = "buy";
const CHECK: &str = "buy status is 200";

#[derive(Debug, Clone, Copy, Default)]
pub struct BuyScenario;

#[async_trait]
impl Scenario for BuyScenario {
    fn name(&self) -> &'static str {
        NAME
    }

    fn check_preconditions(
        &self,
        state: &SetupState,
        settings: &ScenarioSettings,
    ) -> Result<(), ScenarioError> {
        if state.is_empty() {
            return Err(ScenarioError::NoIdentities { scenario: NAME });
        }
        if settings.catalog.is_empty() {
            return Err(ScenarioError::EmptyCatalog { scenario: NAME });
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
        let item = ctx
            .settings
            .catalog
            .choose(rng)
            .ok_or(ScenarioError::EmptyCatalog { scenario: NAME })?;

        let result = ctx.target.buy(token, item).await;
        Ok(Iteration::status_check(NAME, CHECK, Endpoint::Buy, result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::ScenarioSettings;
    use crate::test_utils::{StubTarget, context, context_with_settings, state_with};
    use rand::SeedableRng;

    #[tokio::test]
    async fn test_buy_picks_from_catalog() {
        let target = StubTarget::new();
        let ctx = context(target.clone(), state_with(3));
        let mut rng = ScenarioRng::seed_from_u64(9);

        for _ in 0..60 {
            assert!(BuyScenario.execute(&ctx, &mut rng).await.unwrap().passed());
        }

        let items = target.items_bought();
        assert_eq!(items.len(), 60);
        for item in ["pen", "socks", "cup"] {
            assert!(items.iter().any(|i| i == item), "{} never bought", item);
        }
        assert!(items.iter().all(|i| ["pen", "socks", "cup"].contains(&i.as_str())));
    }

    #[tokio::test]
    async fn test_empty_catalog_is_configuration_error() {
        let target = StubTarget::new();
        let settings = ScenarioSettings {
            catalog: Vec::new(),
            ..Default::default()
        };
        let ctx = context_with_settings(target.clone(), state_with(3), settings);
        let mut rng = ScenarioRng::seed_from_u64(9);

        assert_eq!(
            BuyScenario.execute(&ctx, &mut rng).await,
            Err(ScenarioError::EmptyCatalog { scenario: NAME })
        );
        assert_eq!(target.calls(Endpoint::Buy), 0);
    }
}
