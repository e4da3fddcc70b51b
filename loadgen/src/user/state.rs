use rand::Rng;
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

use crate::config::ConfigError;

/// Virtual user lifecycle
///
/// States only move forward: `Idle -> Running -> Stopping -> Stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum UserState {
    Idle = 0,
    Running = 1,
    Stopping = 2,
    Stopped = 3,
}

impl UserState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => UserState::Idle,
            1 => UserState::Running,
            2 => UserState::Stopping,
            _ => UserState::Stopped,
        }
    }

    /// Counted towards the pool's population
    pub fn is_active(&self) -> bool {
        matches!(self, UserState::Running | UserState::Stopping)
    }
}

/// Lifecycle state shared between a user task and the pool
#[derive(Debug, Clone)]
pub struct UserStateCell(Arc<AtomicU8>);

impl UserStateCell {
    pub fn new() -> Self {
        Self(Arc::new(AtomicU8::new(UserState::Idle as u8)))
    }

    pub fn get(&self) -> UserState {
        UserState::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Move forward to `state`; moving backwards is ignored
    pub fn advance(&self, state: UserState) -> UserState {
        let previous = self.0.fetch_max(state as u8, Ordering::AcqRel);
        UserState::from_u8(previous.max(state as u8))
    }
}

impl Default for UserStateCell {
    fn default() -> Self {
        Self::new()
    }
}

/// Inclusive range the think time between requests is drawn from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitTime {
    min: Duration,
    max: Duration,
}

impl WaitTime {
    pub fn between(min: Duration, max: Duration) -> Result<Self, ConfigError> {
        if min > max {
            return Err(ConfigError::InvalidWaitRange { min, max });
        }
        Ok(Self { min, max })
    }

    /// A fixed wait
    pub fn constant(wait: Duration) -> Self {
        Self {
            min: wait,
            max: wait,
        }
    }

    pub fn min(&self) -> Duration {
        self.min
    }

    pub fn max(&self) -> Duration {
        self.max
    }

    /// Draw a wait uniformly from `[min, max]`
    ///
    /// Bounds beyond `u64::MAX` nanoseconds saturate there.
    pub fn sample<R: Rng>(&self, rng: &mut R) -> Duration {
        if self.min == self.max {
            return self.min;
        }
        let min = saturating_nanos(self.min);
        let max = saturating_nanos(self.max);
        Duration::from_nanos(rng.random_range(min..=max))
    }
}

fn saturating_nanos(duration: Duration) -> u64 {
    u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX)
}
