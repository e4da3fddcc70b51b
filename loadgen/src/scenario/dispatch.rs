//! Built-in traffic mix for the parcel dispatch service
//!
//! Every scenario issues `GET /dispatch` for one customer, tagged with the
//! customer's `location` and a `status` header. The `status` value is passed
//! through untouched; the dispatch frontend answers `status: error` with
//! HTTP 400, so those scenarios show up as failures in the stats.

use uuid::Uuid;

use super::registry::{ScenarioRegistry, ScenarioSet};
use super::types::RequestSpec;
use crate::config::ConfigError;

/// Dispatch endpoint path
pub const DISPATCH_PATH: &str = "/dispatch";

/// One row of the dispatch mix
#[derive(Debug, Clone, Copy)]
pub struct DispatchProfile {
    pub name: &'static str,
    pub weight: u32,
    pub customer: &'static str,
    pub location: &'static str,
    pub status: &'static str,
}

/// The weighted dispatch mix (total weight 100)
pub const DISPATCH_PROFILES: &[DispatchProfile] = &[
    DispatchProfile {
        name: "dispatch_motorsport_success",
        weight: 50,
        customer: "123",
        location: "VA",
        status: "processed",
    },
    DispatchProfile {
        name: "dispatch_motorsport_failed",
        weight: 10,
        customer: "123",
        location: "VA",
        status: "error",
    },
    DispatchProfile {
        name: "dispatch_esports_success",
        weight: 9,
        customer: "392",
        location: "MD",
        status: "processed",
    },
    DispatchProfile {
        name: "dispatch_esports_failed",
        weight: 1,
        customer: "392",
        location: "MD",
        status: "error",
    },
    DispatchProfile {
        name: "dispatch_taxidermy_success",
        weight: 12,
        customer: "731",
        location: "AL",
        status: "processed",
    },
    DispatchProfile {
        name: "dispatch_taxidermy_failed",
        weight: 3,
        customer: "731",
        location: "AL",
        status: "error",
    },
    DispatchProfile {
        name: "dispatch_distillery_success",
        weight: 13,
        customer: "567",
        location: "MA",
        status: "processed",
    },
    DispatchProfile {
        name: "dispatch_distillery_failed",
        weight: 2,
        customer: "567",
        location: "MA",
        status: "error",
    },
];

impl DispatchProfile {
    /// Build a dispatch request with a fresh cache-busting nonce
    pub fn request(&self) -> RequestSpec {
        RequestSpec::get(DISPATCH_PATH)
            .query("customer", self.customer)
            .query("nonse", Uuid::new_v4().to_string())
            .header("location", self.location)
            .header("status", self.status)
    }
}

/// Register the dispatch mix into an existing registry
pub fn register_dispatch_scenarios(registry: &mut ScenarioRegistry) -> Result<(), ConfigError> {
    for profile in DISPATCH_PROFILES {
        let profile = *profile;
        registry.register(profile.name, profile.weight, move || profile.request())?;
    }
    Ok(())
}

/// Finalized scenario set containing only the dispatch mix
pub fn dispatch_scenarios() -> Result<ScenarioSet, ConfigError> {
    let mut registry = ScenarioRegistry::new();
    register_dispatch_scenarios(&mut registry)?;
    registry.finalize()
}
