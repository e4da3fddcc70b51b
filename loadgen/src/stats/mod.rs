//! Request statistics
//!
//! This module provides:
//! - `RequestOutcome`, produced once per executed request
//! - `StatsAggregator`, the concurrent per-scenario collector
//! - `StatsSnapshot`, an immutable copy handed to reporters

mod aggregator;
mod types;

pub use aggregator::StatsAggregator;
pub use types::{RequestOutcome, ScenarioStats, StatsSnapshot};
