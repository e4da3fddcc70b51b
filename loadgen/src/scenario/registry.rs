//! Scenario registration and the finalized, read-only scenario set

use rand::Rng;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use super::selector::WeightedSelector;
use super::types::RequestSpec;
use crate::config::ConfigError;

/// Function producing a fresh request each time a scenario is selected
pub type BuildFn = Arc<dyn Fn() -> RequestSpec + Send + Sync>;

/// A named, weighted request template
#[derive(Clone)]
pub struct Scenario {
    name: String,
    weight: u32,
    build: BuildFn,
}

impl Scenario {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn weight(&self) -> u32 {
        self.weight
    }

    /// Build the request for one execution of this scenario
    pub fn build(&self) -> RequestSpec {
        (self.build)()
    }
}

impl fmt::Debug for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scenario")
            .field("name", &self.name)
            .field("weight", &self.weight)
            .finish_non_exhaustive()
    }
}

/// Mutable registry used during startup
#[derive(Debug, Default)]
pub struct ScenarioRegistry {
    scenarios: Vec<Scenario>,
    names: HashSet<String>,
}

impl ScenarioRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a scenario. Weight must be positive and the name unique.
    pub fn register<F>(
        &mut self,
        name: impl Into<String>,
        weight: u32,
        build: F,
    ) -> Result<&mut Self, ConfigError>
    where
        F: Fn() -> RequestSpec + Send + Sync + 'static,
    {
        let name = name.into();

        if name.is_empty() {
            return Err(ConfigError::InvalidScenario {
                name,
                reason: "name must not be empty".to_string(),
            });
        }
        if weight == 0 {
            return Err(ConfigError::InvalidScenario {
                name,
                reason: "weight must be positive".to_string(),
            });
        }
        if self.names.contains(&name) {
            return Err(ConfigError::InvalidScenario {
                name,
                reason: "duplicate scenario name".to_string(),
            });
        }

        debug!("Registered scenario {} (weight {})", name, weight);
        self.names.insert(name.clone());
        self.scenarios.push(Scenario {
            name,
            weight,
            build: Arc::new(build),
        });
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.scenarios.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }

    /// Freeze the registry and precompute the selection table
    pub fn finalize(self) -> Result<ScenarioSet, ConfigError> {
        let selector = WeightedSelector::from_weights(self.scenarios.iter().map(|s| s.weight))
            .ok_or(ConfigError::EmptyRegistry)?;

        Ok(ScenarioSet {
            scenarios: self.scenarios,
            selector,
        })
    }
}

/// Immutable scenario list shared by every virtual user
#[derive(Debug)]
pub struct ScenarioSet {
    scenarios: Vec<Scenario>,
    selector: WeightedSelector,
}

impl ScenarioSet {
    /// Draw a scenario using the calling thread's generator
    pub fn select(&self) -> &Scenario {
        &self.scenarios[self.selector.select()]
    }

    /// Draw a scenario using a caller-owned generator
    pub fn select_with<R: Rng>(&self, rng: &mut R) -> &Scenario {
        &self.scenarios[self.selector.select_with(rng)]
    }

    pub fn get(&self, index: usize) -> Option<&Scenario> {
        self.scenarios.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Scenario> {
        self.scenarios.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.scenarios.iter().map(|s| s.name.as_str())
    }

    pub fn selector(&self) -> &WeightedSelector {
        &self.selector
    }

    pub fn total_weight(&self) -> u64 {
        self.selector.total_weight()
    }

    pub fn len(&self) -> usize {
        self.scenarios.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }

    /// Long-run selection probability of each scenario
    pub fn probabilities(&self) -> Vec<(&str, f64)> {
        let total = self.total_weight() as f64;
        self.scenarios
            .iter()
            .map(|s| (s.name.as_str(), f64::from(s.weight) / total))
            .collect()
    }
}
