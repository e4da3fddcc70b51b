//! Thread-safe per-scenario statistics
//!
//! Entries live in a `DashMap`, which shards its lock. Writers for different
//! scenarios rarely contend, and every update to one scenario happens under
//! that entry's shard lock, so a snapshot never sees a half-applied outcome.

use dashmap::DashMap;
use indexmap::IndexMap;
use metrics::{counter, histogram};
use std::time::SystemTime;
use tracing::{debug, warn};

use super::types::{RequestOutcome, ScenarioStats, StatsSnapshot};

/// Collector fed by every virtual user
#[derive(Debug, Default)]
pub struct StatsAggregator {
    entries: DashMap<String, ScenarioStats>,
    /// Registered scenario names, in registry order
    order: Vec<String>,
}

impl StatsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Aggregator pre-seeded with every scenario name so that scenarios which
    /// were never selected still appear (at zero) in snapshots
    pub fn with_scenarios<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let order: Vec<String> = names.into_iter().map(Into::into).collect();
        let entries = DashMap::with_capacity(order.len());
        for name in &order {
            entries.insert(name.clone(), ScenarioStats::default());
        }
        Self { entries, order }
    }

    /// Fold one outcome into its scenario's entry
    pub fn record(&self, outcome: &RequestOutcome) {
        let result = if outcome.success { "success" } else { "failure" };
        counter!(
            "loadgen_requests_total",
            "scenario" => outcome.scenario.clone(),
            "outcome" => result
        )
        .increment(1);
        histogram!(
            "loadgen_request_duration_seconds",
            "scenario" => outcome.scenario.clone()
        )
        .record(outcome.elapsed);

        if let Some(mut entry) = self.entries.get_mut(&outcome.scenario) {
            entry.record(outcome);
            return;
        }

        warn!(
            "Outcome for unregistered scenario '{}', adding entry",
            outcome.scenario
        );
        self.entries
            .entry(outcome.scenario.clone())
            .or_default()
            .record(outcome);
    }

    /// Copy every entry
    ///
    /// Registered scenarios come first in registry order, followed by any
    /// others sorted by name.
    pub fn snapshot(&self) -> StatsSnapshot {
        let mut scenarios = IndexMap::with_capacity(self.entries.len());
        for name in &self.order {
            if let Some(entry) = self.entries.get(name) {
                scenarios.insert(name.clone(), entry.value().clone());
            }
        }

        let mut extra: Vec<(String, ScenarioStats)> = self
            .entries
            .iter()
            .filter(|entry| !scenarios.contains_key(entry.key()))
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();
        extra.sort_by(|a, b| a.0.cmp(&b.0));
        scenarios.extend(extra);

        StatsSnapshot {
            taken_at: SystemTime::now(),
            scenarios,
        }
    }

    /// Stats for a single scenario
    pub fn get(&self, scenario: &str) -> Option<ScenarioStats> {
        self.entries.get(scenario).map(|entry| entry.value().clone())
    }

    /// Zero every counter, keeping registered scenarios
    ///
    /// Callers must not run this concurrently with in-flight `record` calls
    /// if they need a clean cut between measurement windows.
    pub fn reset(&self) {
        self.entries
            .retain(|name, _| self.order.iter().any(|registered| registered == name));
        for mut entry in self.entries.iter_mut() {
            *entry.value_mut() = ScenarioStats::default();
        }
        debug!("Statistics reset");
    }

    /// Total number of recorded outcomes across all scenarios
    pub fn total_requests(&self) -> u64 {
        self.entries.iter().map(|entry| entry.value().count).sum()
    }
}
