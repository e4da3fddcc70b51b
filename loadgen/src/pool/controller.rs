//! User pool controller
//!
//! Owns the population of virtual users. A ramp task grows the population at
//! the requested spawn rate; shrinking happens at once, newest users first.
//! Bookkeeping sits behind short-lived `std::sync::Mutex`es that are never
//! held across an `.await`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use super::types::{PoolError, RampPhase, RampStatus, Shutdown};
use crate::config::{ConfigError, validate_spawn_rate};
use crate::user::{UserContext, UserHandle, UserSettings, UserState, VirtualUser, WaitTime};

struct RampTask {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

struct PoolInner {
    context: UserContext,
    settings: UserSettings,
    tracker: TaskTracker,
    /// Handles in spawn order (oldest first)
    users: Mutex<Vec<UserHandle>>,
    ramp: Mutex<Option<RampTask>>,
    ramp_status: watch::Sender<RampStatus>,
    next_id: AtomicU64,
}

/// Controller for the virtual user population
#[derive(Clone)]
pub struct UserPool {
    inner: Arc<PoolInner>,
}

impl UserPool {
    /// Create an empty pool. Fails if the wait range is inverted.
    pub fn new(context: UserContext, settings: UserSettings) -> Result<Self, ConfigError> {
        WaitTime::between(settings.min_wait, settings.max_wait)?;
        let (ramp_status, _) = watch::channel(RampStatus {
            generation: 0,
            phase: RampPhase::Idle,
        });
        Ok(Self {
            inner: Arc::new(PoolInner {
                context,
                settings,
                tracker: TaskTracker::new(),
                users: Mutex::new(Vec::new()),
                ramp: Mutex::new(None),
                ramp_status,
                next_id: AtomicU64::new(1),
            }),
        })
    }

    /// Move the population towards `target_count`
    ///
    /// Any ramp in progress is abandoned. Surplus users are cancelled
    /// immediately, newest first; missing users are spawned one every
    /// `1 / spawn_rate` seconds, the first one interval from now.
    pub fn start(&self, target_count: usize, spawn_rate: f64) -> Result<(), PoolError> {
        if target_count == 0 {
            return Err(ConfigError::InvalidUserCount.into());
        }
        validate_spawn_rate(spawn_rate)?;

        let mut ramp = self.inner.lock_ramp();
        if let Some(previous) = ramp.take() {
            debug!("Superseding ramp in progress");
            previous.cancel.cancel();
        }

        let mut generation = 0;
        self.inner.ramp_status.send_modify(|status| {
            status.generation += 1;
            status.phase = RampPhase::Ramping;
            generation = status.generation;
        });

        let cancelled = self.inner.cancel_surplus(target_count);
        if cancelled > 0 {
            info!("Cancelled {} surplus users", cancelled);
        }

        let interval = Duration::try_from_secs_f64(1.0 / spawn_rate).unwrap_or(Duration::MAX);
        let cancel = CancellationToken::new();
        let task = tokio::spawn(ramp_users(
            Arc::clone(&self.inner),
            target_count,
            interval,
            generation,
            cancel.clone(),
        ));
        *ramp = Some(RampTask { cancel, task });

        info!(
            "Ramping to {} users at {} users/s",
            target_count, spawn_rate
        );
        Ok(())
    }

    /// Stop the ramp and every user
    pub async fn stop(&self, shutdown: Shutdown) -> Result<(), PoolError> {
        self.inner.cancel_ramp();
        let signalled = self.inner.cancel_all();
        info!("Stopping {} users ({:?})", signalled, shutdown);

        let timeout = match shutdown {
            Shutdown::Immediate => return Ok(()),
            Shutdown::Graceful(timeout) => timeout,
        };

        self.inner.tracker.close();
        let drained = tokio::time::timeout(timeout, self.inner.tracker.wait()).await;
        self.inner.tracker.reopen();

        match drained {
            Ok(()) => {
                self.inner.prune();
                info!("All users stopped");
                Ok(())
            }
            Err(_) => {
                let remaining = self.current_count();
                warn!(
                    "{} users still running after {:?}",
                    remaining, timeout
                );
                Err(PoolError::CancellationTimeout { remaining, timeout })
            }
        }
    }

    /// Forcefully terminate every remaining user task
    pub fn abort(&self) {
        self.inner.cancel_ramp();
        if let Some(ramp) = self.inner.lock_ramp().take() {
            ramp.task.abort();
        }
        let mut users = self.inner.lock_users();
        let aborted = users.len();
        for handle in users.drain(..) {
            handle.abort();
        }
        warn!("Aborted {} user tasks", aborted);
    }

    /// Number of users currently Running or Stopping
    pub fn current_count(&self) -> usize {
        self.inner
            .lock_users()
            .iter()
            .filter(|handle| handle.is_active())
            .count()
    }

    /// Ids of users that are active and not yet asked to stop, oldest first
    pub fn live_user_ids(&self) -> Vec<u64> {
        self.inner
            .lock_users()
            .iter()
            .filter(|handle| is_live(handle))
            .map(UserHandle::id)
            .collect()
    }

    /// Phase of the most recent ramp
    pub fn ramp_phase(&self) -> RampPhase {
        self.inner.ramp_status.borrow().phase
    }

    /// Wait until the current ramp settles
    ///
    /// Returns true once the target population was reached and false if the
    /// ramp was cancelled (or none was ever started).
    pub async fn ramp_finished(&self) -> bool {
        let mut rx = self.inner.ramp_status.subscribe();
        match rx.wait_for(|status| status.phase != RampPhase::Ramping).await {
            Ok(status) => status.phase == RampPhase::Finished,
            Err(_) => false,
        }
    }
}

impl PoolInner {
    fn lock_users(&self) -> MutexGuard<'_, Vec<UserHandle>> {
        self.users.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_ramp(&self) -> MutexGuard<'_, Option<RampTask>> {
        self.ramp.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Spawn one user unless the ramp has been cancelled meanwhile
    ///
    /// The cancellation check happens under the users lock so a concurrent
    /// `stop` either sees the new handle or the ramp never spawns it.
    fn spawn_user(&self, ramp: &CancellationToken) -> Result<Option<u64>, ConfigError> {
        let mut users = self.lock_users();
        if ramp.is_cancelled() {
            return Ok(None);
        }
        users.retain(|handle| handle.state() != UserState::Stopped);

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let user = VirtualUser::new(
            id,
            self.context.clone(),
            &self.settings,
            CancellationToken::new(),
        )?;
        users.push(user.spawn(&self.tracker));
        Ok(Some(id))
    }

    fn live_count(&self) -> usize {
        self.lock_users()
            .iter()
            .filter(|handle| is_live(handle))
            .count()
    }

    /// Cancel live users beyond `target`, newest first
    fn cancel_surplus(&self, target: usize) -> usize {
        let users = self.lock_users();
        let live = users.iter().filter(|handle| is_live(handle)).count();
        let surplus = live.saturating_sub(target);
        for handle in users.iter().rev().filter(|handle| is_live(handle)).take(surplus) {
            debug!("Cancelling user {}", handle.id());
            handle.cancel();
        }
        surplus
    }

    fn cancel_all(&self) -> usize {
        let users = self.lock_users();
        let mut signalled = 0;
        for handle in users.iter().filter(|handle| !handle.is_cancelled()) {
            handle.cancel();
            signalled += 1;
        }
        signalled
    }

    fn cancel_ramp(&self) {
        if let Some(ramp) = self.lock_ramp().as_ref() {
            ramp.cancel.cancel();
        }
        self.ramp_status.send_if_modified(|status| {
            if status.phase == RampPhase::Ramping {
                status.phase = RampPhase::Cancelled;
                true
            } else {
                false
            }
        });
    }

    fn prune(&self) {
        self.lock_users()
            .retain(|handle| handle.state() != UserState::Stopped);
    }

    /// Mark ramp `generation` finished if it is still the current one
    fn finish_ramp(&self, generation: u64) -> bool {
        self.ramp_status.send_if_modified(|status| {
            if status.generation == generation && status.phase == RampPhase::Ramping {
                status.phase = RampPhase::Finished;
                true
            } else {
                false
            }
        })
    }
}

fn is_live(handle: &UserHandle) -> bool {
    handle.is_active() && !handle.is_cancelled()
}

/// Spawn users on a fixed schedule until `target` live users exist
async fn ramp_users(
    inner: Arc<PoolInner>,
    target: usize,
    interval: Duration,
    generation: u64,
    cancel: CancellationToken,
) {
    let mut next = Instant::now();
    loop {
        let live = inner.live_count();
        if live >= target {
            break;
        }

        next = match next.checked_add(interval) {
            Some(next) => next,
            None => {
                // Interval too long to schedule; only cancellation ends it
                cancel.cancelled().await;
                return;
            }
        };
        tokio::select! {
            _ = tokio::time::sleep_until(next) => {}
            _ = cancel.cancelled() => return,
        }

        match inner.spawn_user(&cancel) {
            Ok(Some(id)) => debug!("Spawned user {} ({}/{})", id, live + 1, target),
            Ok(None) => return,
            Err(e) => {
                error!("Failed to spawn user: {}", e);
                return;
            }
        }
    }

    if inner.finish_ramp(generation) {
        info!("Ramp finished: {} users running", target);
    }
}
