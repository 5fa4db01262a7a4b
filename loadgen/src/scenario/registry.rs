//! Scenario registry: name -> scenario function + its own ramp profile

use indexmap::IndexMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use super::types::Scenario;
use super::{AuthScenario, BuyScenario, InfoScenario, SendCoinScenario};
use crate::schedule::RampProfile;

/// Registry errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("Scenario '{0}' is already registered")]
    Duplicate(String),

    #[error("Unknown scenario '{name}' (available: {available})")]
    Unknown { name: String, available: String },
}

/// A registered scenario
#[derive(Clone)]
pub struct ScenarioDescriptor {
    pub name: String,
    pub profile: RampProfile,
    pub scenario: Arc<dyn Scenario>,
}

impl ScenarioDescriptor {
    pub fn new(profile: RampProfile, scenario: Arc<dyn Scenario>) -> Self {
        Self {
            name: scenario.name().to_string(),
            profile,
            scenario,
        }
    }
}

impl std::fmt::Debug for ScenarioDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScenarioDescriptor")
            .field("name", &self.name)
            .field("profile", &self.profile)
            .finish_non_exhaustive()
    }
}

/// Ramp peaks for each built-in scenario
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioPeaks {
    pub auth: Vec<u32>,
    pub info: Vec<u32>,
    pub send_coin: Vec<u32>,
    pub buy: Vec<u32>,
}

impl Default for ScenarioPeaks {
    fn default() -> Self {
        Self {
            auth: vec![150, 200, 250],
            info: vec![700, 1000, 1100],
            send_coin: vec![750, 1000, 1100],
            buy: vec![1100],
        }
    }
}

/// Unique-name map of scenarios; at most one is selected per run
#[derive(Debug, Clone, Default)]
pub struct ScenarioRegistry {
    scenarios: IndexMap<String, ScenarioDescriptor>,
}

impl ScenarioRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The four shop scenarios with profiles built from `peaks`
    pub fn builtin(peaks: &ScenarioPeaks, rise: Duration, hold: Duration) -> Self {
        let profile = |p: &[u32]| RampProfile::from_peaks_with(p, rise, hold);

        let mut registry = Self::new();
        let builtins: [(RampProfile, Arc<dyn Scenario>); 4] = [
            (profile(&peaks.auth), Arc::new(AuthScenario)),
            (profile(&peaks.info), Arc::new(InfoScenario)),
            (profile(&peaks.send_coin), Arc::new(SendCoinScenario)),
            (profile(&peaks.buy), Arc::new(BuyScenario)),
        ];
        for (profile, scenario) in builtins {
            let registered = registry.register(ScenarioDescriptor::new(profile, scenario));
            debug_assert!(registered.is_ok(), "duplicate builtin scenario: {:?}", registered);
        }
        registry
    }

    pub fn register(&mut self, descriptor: ScenarioDescriptor) -> Result<(), RegistryError> {
        if self.scenarios.contains_key(&descriptor.name) {
            return Err(RegistryError::Duplicate(descriptor.name));
        }
        self.scenarios.insert(descriptor.name.clone(), descriptor);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&ScenarioDescriptor> {
        self.scenarios.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.scenarios.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.scenarios.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }

    /// Resolve the externally supplied selection.
    ///
    /// `None` or an empty name selects nothing (a zero-traffic run); an unknown name is
    /// an error.
    pub fn select(&self, selection: Option<&str>) -> Result<Option<&ScenarioDescriptor>, RegistryError> {
        let Some(name) = selection.map(str::trim).filter(|n| !n.is_empty()) else {
            return Ok(None);
        };

        self.scenarios
            .get(name)
            .map(Some)
            .ok_or_else(|| RegistryError::Unknown {
                name: name.to_string(),
                available: self.names().collect::<Vec<_>>().join(", "),
            })
    }
}
