//! Virtual user population control
//!
//! `UserPool` ramps the number of running users up or down at a fixed spawn
//! rate and stops them gracefully, immediately or by force.

mod controller;
mod types;

pub use controller::UserPool;
pub use types::{PoolError, RampPhase, Shutdown};
