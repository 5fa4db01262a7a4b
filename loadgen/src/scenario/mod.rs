//! Scenarios and the state they share
//!
//! This module provides:
//! - `Scenario` trait implemented by the four shop scenarios
//! - `SetupProvider` producing the shared `SetupState` before load starts
//! - `ScenarioRegistry` mapping scenario names to functions and ramp profiles

pub mod auth;
pub mod buy;
pub mod info;
mod registry;
pub mod send_coin;
mod setup;
mod types;

pub use auth::AuthScenario;
pub use buy::BuyScenario;
pub use info::InfoScenario;
pub use registry::{RegistryError, ScenarioDescriptor, ScenarioPeaks, ScenarioRegistry};
pub use send_coin::SendCoinScenario;
pub use setup::{
    IdentityPlan, SETUP_CHECK, SETUP_SCENARIO, SetupProvider, SetupReport, SetupState,
};
pub use types::{
    CheckResult, Iteration, RequestSample, Scenario, ScenarioContext, ScenarioError,
    ScenarioRng, ScenarioSettings,
};
