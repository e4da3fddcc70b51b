//! Loadgen Library
//!
//! Weighted-scenario HTTP load generation: a pool of virtual users picks
//! scenarios by weight, executes them against a target and aggregates
//! per-scenario statistics.

pub mod config;
pub mod executor;
pub mod pool;
pub mod scenario;
pub mod server;
pub mod stats;
pub mod user;

#[cfg(test)]
mod test_utils;

// Re-export commonly used types
pub use config::{Config, ConfigError};
pub use executor::{ExecutorResponse, HttpExecutor, RequestError, RequestExecutor};
pub use pool::{PoolError, RampPhase, Shutdown, UserPool};
pub use scenario::{RequestSpec, ScenarioRegistry, ScenarioSet};
pub use stats::{RequestOutcome, StatsAggregator, StatsSnapshot};
pub use user::{UserContext, UserSettings};
