//! Test Utilities Module
//!
//! Mock executors and fixture builders shared by the unit tests.
//! This module is only compiled when running tests.

#![cfg(test)]

use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::executor::{ExecutorResponse, RequestError, RequestExecutor};
use crate::scenario::{RequestSpec, ScenarioRegistry, ScenarioSet};
use crate::stats::StatsAggregator;
use crate::user::UserContext;

// ============================================================================
// Mock Executor
// ============================================================================

/// Executor that never touches the network
///
/// Responds after `delay` (on the tokio clock, so paused-time tests can skip
/// it) with either a 200 or the configured error.
#[derive(Debug, Default)]
pub struct MockExecutor {
    delay: Duration,
    error: Option<RequestError>,
    calls: AtomicU64,
}

impl MockExecutor {
    /// Always answers 200
    pub fn ok() -> Self {
        Self::default()
    }

    /// Always fails with `error`
    pub fn failing(error: RequestError) -> Self {
        Self {
            error: Some(error),
            ..Self::default()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Number of `execute` calls started so far
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl RequestExecutor for MockExecutor {
    async fn execute(&self, _spec: &RequestSpec, _timeout: Duration) -> ExecutorResponse {
        self.calls.fetch_add(1, Ordering::Relaxed);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match &self.error {
            Some(error) => ExecutorResponse::failed(error.clone(), self.delay),
            None => ExecutorResponse::from_status(200, self.delay),
        }
    }
}

// ============================================================================
// Fixtures
// ============================================================================

/// Two scenarios, "a" (weight 3) and "b" (weight 1)
pub fn test_scenarios() -> ScenarioSet {
    let mut registry = ScenarioRegistry::new();
    registry
        .register("a", 3, || RequestSpec::get("/a"))
        .and_then(|registry| registry.register("b", 1, || RequestSpec::get("/b")))
        .expect("Failed to register test scenarios");
    registry.finalize().expect("Failed to finalize test scenarios")
}

/// User context around `executor`, plus a handle on its stats
pub fn test_context(executor: MockExecutor) -> (UserContext, Arc<StatsAggregator>) {
    test_context_shared(Arc::new(executor))
}

/// Like `test_context`, but the caller keeps a handle on the executor
pub fn test_context_shared(executor: Arc<MockExecutor>) -> (UserContext, Arc<StatsAggregator>) {
    build_context(test_scenarios(), executor)
}

/// User context over caller-supplied scenarios
pub fn test_context_with(
    scenarios: ScenarioSet,
    executor: MockExecutor,
) -> (UserContext, Arc<StatsAggregator>) {
    build_context(scenarios, Arc::new(executor))
}

fn build_context(
    scenarios: ScenarioSet,
    executor: Arc<MockExecutor>,
) -> (UserContext, Arc<StatsAggregator>) {
    let scenarios = Arc::new(scenarios);
    let stats = Arc::new(StatsAggregator::with_scenarios(scenarios.names()));
    let context = UserContext::new(scenarios, executor, Arc::clone(&stats));
    (context, stats)
}
