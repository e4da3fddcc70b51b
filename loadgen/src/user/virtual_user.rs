//! Virtual user execution loop
//!
//! Each virtual user is one tokio task repeating
//! select -> build -> execute -> record -> wait until its cancellation token
//! fires. Request failures are recorded and never end the loop.

use rand::SeedableRng;
use rand::rngs::StdRng;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, trace};

use super::state::{UserState, UserStateCell, WaitTime};
use crate::config::{Config, ConfigError};
use crate::executor::{ExecutorResponse, RequestError, RequestExecutor};
use crate::scenario::ScenarioSet;
use crate::stats::{RequestOutcome, StatsAggregator};

/// Extra time granted to an executor past the request timeout before the
/// request is abandoned and recorded as timed out
const EXECUTOR_GRACE: Duration = Duration::from_secs(1);

/// Shared, read-only collaborators handed to every user
#[derive(Clone)]
pub struct UserContext {
    pub scenarios: Arc<ScenarioSet>,
    pub executor: Arc<dyn RequestExecutor>,
    pub stats: Arc<StatsAggregator>,
}

impl UserContext {
    pub fn new(
        scenarios: Arc<ScenarioSet>,
        executor: Arc<dyn RequestExecutor>,
        stats: Arc<StatsAggregator>,
    ) -> Self {
        Self {
            scenarios,
            executor,
            stats,
        }
    }
}

/// Per-user loop settings
#[derive(Debug, Clone)]
pub struct UserSettings {
    pub min_wait: Duration,
    pub max_wait: Duration,
    pub request_timeout: Duration,
    /// Stop after this many cycles (None = run until cancelled)
    pub max_iterations: Option<u64>,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            min_wait: Duration::from_secs(1),
            max_wait: Duration::from_secs(3),
            request_timeout: Duration::from_secs(10),
            max_iterations: None,
        }
    }
}

impl From<&Config> for UserSettings {
    fn from(config: &Config) -> Self {
        Self {
            min_wait: config.users.min_wait,
            max_wait: config.users.max_wait,
            request_timeout: config.request.request_timeout,
            max_iterations: None,
        }
    }
}

/// One simulated client
pub struct VirtualUser {
    id: u64,
    context: UserContext,
    wait: WaitTime,
    request_timeout: Duration,
    max_iterations: Option<u64>,
    cancel: CancellationToken,
    state: UserStateCell,
    rng: StdRng,
}

impl VirtualUser {
    /// Create an idle user. Fails if `min_wait > max_wait`.
    pub fn new(
        id: u64,
        context: UserContext,
        settings: &UserSettings,
        cancel: CancellationToken,
    ) -> Result<Self, ConfigError> {
        let wait = WaitTime::between(settings.min_wait, settings.max_wait)?;
        Ok(Self {
            id,
            context,
            wait,
            request_timeout: settings.request_timeout,
            max_iterations: settings.max_iterations,
            cancel,
            state: UserStateCell::new(),
            // Independent generator per user, seeded from the thread-local source
            rng: StdRng::from_rng(&mut rand::rng()),
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn state(&self) -> UserState {
        self.state.get()
    }

    /// Mark the user running and spawn its loop on `tracker`
    pub fn spawn(self, tracker: &TaskTracker) -> UserHandle {
        self.state.advance(UserState::Running);
        let id = self.id;
        let state = self.state.clone();
        let cancel = self.cancel.clone();
        let task = tracker.spawn(self.run());
        UserHandle {
            id,
            state,
            cancel,
            task,
        }
    }

    /// Run the loop until cancelled (or the iteration limit is hit)
    pub async fn run(mut self) {
        let _stopped = StoppedOnDrop(self.state.clone());
        self.state.advance(UserState::Running);
        debug!("Virtual user {} started", self.id);

        let mut iterations = 0u64;
        loop {
            if self.cancel.is_cancelled() {
                break;
            }

            self.run_cycle().await;
            iterations += 1;

            if self.cancel.is_cancelled() {
                break;
            }
            if let Some(max) = self.max_iterations
                && iterations >= max
            {
                break;
            }

            let wait = self.wait.sample(&mut self.rng);
            tokio::select! {
                _ = tokio::time::sleep(wait) => {}
                _ = self.cancel.cancelled() => break,
            }
        }

        self.state.advance(UserState::Stopping);
        self.state.advance(UserState::Stopped);
        debug!(
            "Virtual user {} stopped after {} requests",
            self.id, iterations
        );
    }

    /// One select -> execute -> record cycle
    async fn run_cycle(&mut self) {
        let scenario = self.context.scenarios.select_with(&mut self.rng);
        let spec = scenario.build();
        let limit = self.request_timeout + EXECUTOR_GRACE;

        let request = tokio::time::timeout(
            limit,
            self.context.executor.execute(&spec, self.request_timeout),
        );
        tokio::pin!(request);

        // An in-flight request is allowed to finish (it is bounded by the
        // timeout), but the user is Stopping from the moment it is cancelled.
        let result = tokio::select! {
            result = &mut request => result,
            _ = self.cancel.cancelled() => {
                self.state.advance(UserState::Stopping);
                request.await
            }
        };

        let response = result
            .unwrap_or_else(|_| ExecutorResponse::failed(RequestError::Timeout, limit));
        if let Some(ref error) = response.error {
            trace!(
                "User {} scenario {} failed: {}",
                self.id,
                scenario.name(),
                error
            );
        }

        let outcome = RequestOutcome::from_response(scenario.name(), response);
        self.context.stats.record(&outcome);
    }
}

/// Marks the user Stopped however its loop ends, including by panic
struct StoppedOnDrop(UserStateCell);

impl Drop for StoppedOnDrop {
    fn drop(&mut self) {
        self.0.advance(UserState::Stopped);
    }
}

/// Pool-side view of a spawned user
#[derive(Debug)]
pub struct UserHandle {
    id: u64,
    state: UserStateCell,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl UserHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn state(&self) -> UserState {
        self.state.get()
    }

    /// Running or Stopping
    pub fn is_active(&self) -> bool {
        self.state.get().is_active()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Ask the user to stop after its current request
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Terminate the task at its next suspension point
    pub fn abort(&self) {
        self.cancel.cancel();
        self.task.abort();
        self.state.advance(UserState::Stopped);
    }
}
