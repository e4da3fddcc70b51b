//! Pool control types

use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

use crate::config::ConfigError;

/// How `UserPool::stop` treats running users
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shutdown {
    /// Signal every user, then wait up to the timeout for all of them to stop
    Graceful(Duration),
    /// Signal every user and return without waiting
    Immediate,
}

/// Errors from pool operations
#[derive(Debug, Error)]
pub enum PoolError {
    #[error("{remaining} users still running after waiting {timeout:?} for them to stop")]
    CancellationTimeout { remaining: usize, timeout: Duration },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Progress of the most recent ramp
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RampPhase {
    /// No ramp has been started
    Idle,
    Ramping,
    /// The target population was reached
    Finished,
    /// Superseded by `stop` or `abort` before reaching its target
    Cancelled,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct RampStatus {
    pub generation: u64,
    pub phase: RampPhase,
}
