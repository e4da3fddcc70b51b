//! Scenario module
//!
//! This module provides:
//! - `ScenarioRegistry` for registering named, weighted request templates
//! - `ScenarioSet`, the finalized read-only view shared by all virtual users
//! - `WeightedSelector` for O(log n) weighted draws
//! - The built-in dispatch traffic mix

pub mod dispatch;
mod registry;
mod selector;
mod types;

pub use dispatch::{DISPATCH_PROFILES, dispatch_scenarios, register_dispatch_scenarios};
pub use registry::{BuildFn, Scenario, ScenarioRegistry, ScenarioSet};
pub use selector::WeightedSelector;
pub use types::{Method, RequestSpec};
