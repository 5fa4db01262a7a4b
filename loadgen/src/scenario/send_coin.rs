//! `sendCoin` scenario: transfer coins between two distinct random identities

use async_trait::async_trait;
use rand::Rng;

use super::setup::SetupState;
use super::types::{
    Iteration, Scenario, ScenarioContext, ScenarioError, ScenarioRng, ScenarioSettings,
};
use crate::target::{Endpoint, Transfer};

pub const NAME: &str = "sendCoin";
const CHECK: &str = "sendCoin status is 200";

/// Minimum identities needed for a distinct sender/recipient pair
const REQUIRED_IDENTITIES: usize = 2;

#[derive(Debug, Clone, Copy, Default)]
pub struct SendCoinScenario;

/// A chosen transfer: who pays (by token) and who receives (by username)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pair<'a> {
    pub sender: &'a str,
    pub sender_token: &'a str,
    pub recipient: &'a str,
}

/// Pick a random sender, then a random recipient from the remaining identities
pub fn pick_pair<'a>(state: &'a SetupState, rng: &mut ScenarioRng) -> Result<Pair<'a>, ScenarioError> {
    let available = state.len();
    if available < REQUIRED_IDENTITIES {
        return Err(ScenarioError::InsufficientIdentities {
            scenario: NAME,
            required: REQUIRED_IDENTITIES,
            available,
        });
    }

    let sender_idx = rng.random_range(0..available);
    // Draw from the pool with the sender removed, then map back over the gap
    let mut recipient_idx = rng.random_range(0..available - 1);
    if recipient_idx >= sender_idx {
        recipient_idx += 1;
    }

    let insufficient = || ScenarioError::InsufficientIdentities {
        scenario: NAME,
        required: REQUIRED_IDENTITIES,
        available,
    };
    let (sender, sender_token) = state.identity(sender_idx).ok_or_else(insufficient)?;
    let (recipient, _) = state.identity(recipient_idx).ok_or_else(insufficient)?;

    Ok(Pair {
        sender,
        sender_token,
        recipient,
    })
}

#[async_trait]
impl Scenario for SendCoinScenario {
    fn name(&self) -> &'static str {
        NAME
    }

    fn check_preconditions(
        &self,
        state: &SetupState,
        _settings: &ScenarioSettings,
    ) -> Result<(), ScenarioError> {
        if state.len() < REQUIRED_IDENTITIES {
            return Err(ScenarioError::InsufficientIdentities {
                scenario: NAME,
                required: REQUIRED_IDENTITIES,
                available: state.len(),
            });
        }
        Ok(())
    }

    async fn execute(
        &self,
        ctx: &ScenarioContext,
        rng: &mut ScenarioRng,
    ) -> Result<Iteration, ScenarioError> {
        let pair = pick_pair(&ctx.state, rng)?;
        let transfer = Transfer {
            to_user: pair.recipient.to_string(),
            amount: ctx.settings.transfer_amount,
        };

        let result = ctx.target.send_coin(pair.sender_token, &transfer).await;
        Ok(Iteration::status_check(NAME, CHECK, Endpoint::SendCoin, result))
    }
}
