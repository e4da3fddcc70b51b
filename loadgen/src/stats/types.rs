//! Outcome and statistics types

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::{Duration, SystemTime};

use crate::executor::{ExecutorResponse, RequestError};

/// Result of one scenario execution. Folded into the stats, then dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestOutcome {
    pub scenario: String,
    pub success: bool,
    pub status: Option<u16>,
    pub elapsed: Duration,
    pub error: Option<RequestError>,
}

impl RequestOutcome {
    pub fn from_response(scenario: impl Into<String>, response: ExecutorResponse) -> Self {
        Self {
            scenario: scenario.into(),
            success: response.error.is_none(),
            status: response.status,
            elapsed: response.elapsed,
            error: response.error,
        }
    }

    pub fn success(scenario: impl Into<String>, status: u16, elapsed: Duration) -> Self {
        Self {
            scenario: scenario.into(),
            success: true,
            status: Some(status),
            elapsed,
            error: None,
        }
    }

    pub fn failure(scenario: impl Into<String>, error: RequestError, elapsed: Duration) -> Self {
        let status = match &error {
            RequestError::Status { status } => Some(*status),
            _ => None,
        };
        Self {
            scenario: scenario.into(),
            success: false,
            status,
            elapsed,
            error: Some(error),
        }
    }
}

/// Aggregate statistics for one scenario
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScenarioStats {
    pub count: u64,
    pub success_count: u64,
    pub failure_count: u64,
    /// None until the first outcome is recorded
    pub min_latency: Option<Duration>,
    pub max_latency: Option<Duration>,
    /// Streaming mean in seconds
    pub mean_latency_secs: f64,
    /// Failure category (see `RequestError::category`) to count
    pub failures_by_kind: BTreeMap<String, u64>,
    pub last_status: Option<u16>,
}

impl ScenarioStats {
    /// Fold one outcome into the running totals
    pub fn record(&mut self, outcome: &RequestOutcome) {
        self.count += 1;
        if outcome.success {
            self.success_count += 1;
        } else {
            self.failure_count += 1;
            let kind = outcome
                .error
                .as_ref()
                .map(RequestError::category)
                .unwrap_or_else(|| "unknown".to_string());
            *self.failures_by_kind.entry(kind).or_insert(0) += 1;
        }
        if outcome.status.is_some() {
            self.last_status = outcome.status;
        }

        let latency = outcome.elapsed;
        self.min_latency = Some(self.min_latency.map_or(latency, |m| m.min(latency)));
        self.max_latency = Some(self.max_latency.map_or(latency, |m| m.max(latency)));

        let x = latency.as_secs_f64();
        self.mean_latency_secs += (x - self.mean_latency_secs) / self.count as f64;
    }

    pub fn mean_latency(&self) -> Option<Duration> {
        (self.count > 0).then(|| Duration::from_secs_f64(self.mean_latency_secs))
    }

    /// Fraction of failed requests (0.0 to 1.0)
    pub fn failure_rate(&self) -> f64 {
        if self.count > 0 {
            self.failure_count as f64 / self.count as f64
        } else {
            0.0
        }
    }

    /// Combine two disjoint sets of statistics
    pub fn merge(&mut self, other: &ScenarioStats) {
        if other.count == 0 {
            return;
        }
        let total = self.count + other.count;
        self.mean_latency_secs = (self.mean_latency_secs * self.count as f64
            + other.mean_latency_secs * other.count as f64)
            / total as f64;
        self.count = total;
        self.success_count += other.success_count;
        self.failure_count += other.failure_count;
        self.min_latency = match (self.min_latency, other.min_latency) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        self.max_latency = match (self.max_latency, other.max_latency) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
        for (kind, n) in &other.failures_by_kind {
            *self.failures_by_kind.entry(kind.clone()).or_insert(0) += n;
        }
        if other.last_status.is_some() {
            self.last_status = other.last_status;
        }
    }
}

/// Point-in-time copy of every scenario's statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub taken_at: SystemTime,
    pub scenarios: IndexMap<String, ScenarioStats>,
}

impl StatsSnapshot {
    pub fn get(&self, scenario: &str) -> Option<&ScenarioStats> {
        self.scenarios.get(scenario)
    }

    /// Totals across all scenarios
    pub fn total(&self) -> ScenarioStats {
        let mut total = ScenarioStats::default();
        for stats in self.scenarios.values() {
            total.merge(stats);
        }
        total
    }
}
