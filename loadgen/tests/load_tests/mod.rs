//! Load testing module for the load generator
//!
//! Provides a three-tier benchmark system that drives the dispatch mix
//! against a live target:
//! - **Smoke**: Quick CI validation (<30s)
//! - **Standard**: PR merge gate (~1min)
//! - **Stress**: Manual/release testing (~2min)
//!
//! ## Running Benchmarks
//!
//! ```bash
//! # Smoke test (CI)
//! TARGET_URL=http://127.0.0.1:8080 cargo test --test perf_tests bench_smoke --release -- --ignored --nocapture
//!
//! # Standard test (PR gate)
//! cargo test --test perf_tests bench_standard --release -- --ignored --nocapture
//!
//! # Stress test (release)
//! cargo test --test perf_tests bench_stress --release -- --ignored --nocapture
//! ```

use loadgen::stats::StatsSnapshot;
use serde::Serialize;
use std::time::Duration;

/// Benchmark tier for different testing scenarios
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BenchmarkTier {
    /// Quick CI validation: 10 users, 10s
    Smoke,
    /// PR merge gate: 50 users, 30s
    Standard,
    /// Manual/release testing: 200 users, 60s
    Stress,
}

impl BenchmarkTier {
    /// Get the tier name for display
    pub fn name(&self) -> &'static str {
        match self {
            BenchmarkTier::Smoke => "SMOKE",
            BenchmarkTier::Standard => "STANDARD",
            BenchmarkTier::Stress => "STRESS",
        }
    }
}

/// Load shape for one tier
#[derive(Debug, Clone)]
pub struct TierConfig {
    pub users: usize,
    pub spawn_rate: f64,
    /// Measurement window after the ramp completes
    pub duration: Duration,
    pub min_wait: Duration,
    pub max_wait: Duration,
}

impl TierConfig {
    pub fn for_tier(tier: BenchmarkTier) -> Self {
        match tier {
            BenchmarkTier::Smoke => Self {
                users: 10,
                spawn_rate: 10.0,
                duration: Duration::from_secs(10),
                min_wait: Duration::from_millis(100),
                max_wait: Duration::from_millis(300),
            },
            BenchmarkTier::Standard => Self {
                users: 50,
                spawn_rate: 25.0,
                duration: Duration::from_secs(30),
                min_wait: Duration::from_millis(250),
                max_wait: Duration::from_millis(750),
            },
            BenchmarkTier::Stress => Self {
                users: 200,
                spawn_rate: 50.0,
                duration: Duration::from_secs(60),
                min_wait: Duration::from_secs(1),
                max_wait: Duration::from_secs(3),
            },
        }
    }
}

/// Performance budgets
pub const MEAN_LATENCY_BUDGET: Duration = Duration::from_millis(200);
pub const MAX_UNEXPECTED_FAILURE_RATE: f64 = 0.01;

/// Summary of one benchmark run
#[derive(Debug, Serialize)]
pub struct BenchmarkResults {
    pub requests: u64,
    pub successes: u64,
    /// Failures other than the 400s the `*_failed` scenarios provoke
    pub unexpected_failures: u64,
    pub mean_latency_ms: f64,
    pub max_latency_ms: f64,
    pub requests_per_second: f64,
}

impl BenchmarkResults {
    pub fn from_snapshot(snapshot: &StatsSnapshot, window: Duration) -> Self {
        let total = snapshot.total();
        let expected_failures: u64 = snapshot
            .scenarios
            .iter()
            .filter(|(name, _)| name.ends_with("_failed"))
            .map(|(_, stats)| stats.failures_by_kind.get("http_400").copied().unwrap_or(0))
            .sum();

        Self {
            requests: total.count,
            successes: total.success_count,
            unexpected_failures: total.failure_count - expected_failures,
            mean_latency_ms: total.mean_latency_secs * 1000.0,
            max_latency_ms: total
                .max_latency
                .map(|d| d.as_secs_f64() * 1000.0)
                .unwrap_or(0.0),
            requests_per_second: total.count as f64 / window.as_secs_f64().max(f64::EPSILON),
        }
    }

    pub fn unexpected_failure_rate(&self) -> f64 {
        if self.requests == 0 {
            return 0.0;
        }
        self.unexpected_failures as f64 / self.requests as f64
    }

    pub fn meets_budgets(&self) -> bool {
        self.requests > 0
            && self.unexpected_failure_rate() < MAX_UNEXPECTED_FAILURE_RATE
            && self.mean_latency_ms < MEAN_LATENCY_BUDGET.as_secs_f64() * 1000.0
    }

    pub fn print_summary(&self, tier: BenchmarkTier) {
        println!("\n=== {} BENCHMARK RESULTS ===", tier.name());
        println!("Requests:            {}", self.requests);
        println!("Successes:           {}", self.successes);
        println!(
            "Unexpected failures: {} ({:.2}%)",
            self.unexpected_failures,
            self.unexpected_failure_rate() * 100.0
        );
        println!(
            "Latency:             mean {:.1}ms, max {:.1}ms (budget {:?})",
            self.mean_latency_ms, self.max_latency_ms, MEAN_LATENCY_BUDGET
        );
        println!("Throughput:          {:.1} req/s", self.requests_per_second);
        println!(
            "Budgets:             {}",
            if self.meets_budgets() { "PASS" } else { "FAIL" }
        );
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}
