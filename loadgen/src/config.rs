//! Load generator configuration
//!
//! Configuration is loaded from environment variables. Defaults reproduce the
//! traffic profile the dispatch mix was tuned with (1-3s think time).

use std::env;
use std::time::Duration;
use thiserror::Error;

/// Construction-time configuration errors. These are fatal to startup.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Invalid scenario '{name}': {reason}")]
    InvalidScenario { name: String, reason: String },

    #[error("Scenario registry is empty or has zero total weight")]
    EmptyRegistry,

    #[error("Invalid wait range: min {min:?} is greater than max {max:?}")]
    InvalidWaitRange { min: Duration, max: Duration },

    #[error("Target user count must be positive")]
    InvalidUserCount,

    #[error("Spawn rate must be a positive number of users per second, got {0}")]
    InvalidSpawnRate(f64),
}

/// Main load generator configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the service under test
    pub target_url: String,

    /// Population settings
    pub users: UsersConfig,

    /// Per-request settings
    pub request: RequestConfig,

    /// Run lifecycle settings
    pub run: RunConfig,

    /// Status listener settings
    pub status: StatusConfig,
}

/// Virtual user population configuration
#[derive(Debug, Clone)]
pub struct UsersConfig {
    /// Number of concurrently running virtual users to reach
    pub target_user_count: usize,
    /// New users per second during ramp-up
    pub spawn_rate: f64,
    /// Lower bound of the wait between requests (inclusive)
    pub min_wait: Duration,
    /// Upper bound of the wait between requests (inclusive)
    pub max_wait: Duration,
}

/// Request configuration
#[derive(Debug, Clone)]
pub struct RequestConfig {
    /// Per-request timeout handed to the executor
    pub request_timeout: Duration,
}

/// Run lifecycle configuration
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Stop automatically after this long (None = until Ctrl+C)
    pub run_time: Option<Duration>,
    /// Bound on graceful shutdown before remaining users are aborted
    pub stop_timeout: Duration,
    /// How often the stats summary is logged
    pub stats_interval: Duration,
    /// Start a fresh measurement window once the ramp completes
    pub reset_stats_after_ramp: bool,
}

/// Status endpoint configuration
#[derive(Debug, Clone)]
pub struct StatusConfig {
    pub host: String,
    pub port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            target_url: "http://127.0.0.1:8080".to_string(),
            users: UsersConfig::default(),
            request: RequestConfig::default(),
            run: RunConfig::default(),
            status: StatusConfig::default(),
        }
    }
}

impl Default for UsersConfig {
    fn default() -> Self {
        Self {
            target_user_count: 10,
            spawn_rate: 1.0,
            min_wait: Duration::from_secs(1),
            max_wait: Duration::from_secs(3),
        }
    }
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(10),
        }
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            run_time: None,
            stop_timeout: Duration::from_secs(30),
            stats_interval: Duration::from_secs(5),
            reset_stats_after_ramp: false,
        }
    }
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 9646,
        }
    }
}

fn parse_bool(val: &str) -> bool {
    val.to_lowercase() == "true" || val == "1"
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(url) = env::var("TARGET_URL")
            && !url.is_empty()
        {
            config.target_url = url;
        }

        // Population
        if let Ok(val) = env::var("USERS")
            && let Ok(v) = val.parse()
        {
            config.users.target_user_count = v;
        }
        if let Ok(val) = env::var("SPAWN_RATE")
            && let Ok(v) = val.parse()
        {
            config.users.spawn_rate = v;
        }
        if let Ok(val) = env::var("MIN_WAIT_MS")
            && let Ok(ms) = val.parse::<u64>()
        {
            config.users.min_wait = Duration::from_millis(ms);
        }
        if let Ok(val) = env::var("MAX_WAIT_MS")
            && let Ok(ms) = val.parse::<u64>()
        {
            config.users.max_wait = Duration::from_millis(ms);
        }

        // Requests
        if let Ok(val) = env::var("REQUEST_TIMEOUT_MS")
            && let Ok(ms) = val.parse::<u64>()
        {
            config.request.request_timeout = Duration::from_millis(ms);
        }

        // Run lifecycle
        if let Ok(val) = env::var("RUN_TIME_SECS")
            && let Ok(secs) = val.parse::<u64>()
            && secs > 0
        {
            config.run.run_time = Some(Duration::from_secs(secs));
        }
        if let Ok(val) = env::var("STOP_TIMEOUT_SECS")
            && let Ok(secs) = val.parse::<u64>()
        {
            config.run.stop_timeout = Duration::from_secs(secs);
        }
        if let Ok(val) = env::var("STATS_INTERVAL_SECS")
            && let Ok(secs) = val.parse::<u64>()
            && secs > 0
        {
            config.run.stats_interval = Duration::from_secs(secs);
        }
        if let Ok(val) = env::var("RESET_STATS_AFTER_RAMP") {
            config.run.reset_stats_after_ramp = parse_bool(&val);
        }

        // Status listener
        if let Ok(host) = env::var("STATUS_HOST") {
            config.status.host = host;
        }
        if let Ok(port) = env::var("STATUS_PORT")
            && let Ok(p) = port.parse()
        {
            config.status.port = p;
        }

        config
    }

    /// Check the population and wait settings before anything is spawned
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.users.target_user_count == 0 {
            return Err(ConfigError::InvalidUserCount);
        }
        validate_spawn_rate(self.users.spawn_rate)?;
        if self.users.min_wait > self.users.max_wait {
            return Err(ConfigError::InvalidWaitRange {
                min: self.users.min_wait,
                max: self.users.max_wait,
            });
        }
        Ok(())
    }
}

pub(crate) fn validate_spawn_rate(rate: f64) -> Result<(), ConfigError> {
    if rate.is_finite() && rate > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidSpawnRate(rate))
    }
}
