use anyhow::Context;
use loadgen::config::Config;
use loadgen::executor::HttpExecutor;
use loadgen::pool::{PoolError, Shutdown, UserPool};
use loadgen::scenario::dispatch_scenarios;
use loadgen::server::{StatusState, status_routes};
use loadgen::stats::{StatsAggregator, StatsSnapshot};
use loadgen::user::{UserContext, UserSettings};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the Prometheus metrics recorder
fn setup_prometheus_metrics() -> anyhow::Result<PrometheusHandle> {
    PrometheusBuilder::new()
        .install_recorder()
        .context("Failed to install Prometheus recorder")
}

fn millis(latency: Option<Duration>) -> f64 {
    latency.map(|d| d.as_secs_f64() * 1000.0).unwrap_or(0.0)
}

/// Log a per-scenario summary of `snapshot`
fn log_snapshot(snapshot: &StatsSnapshot, users: usize) {
    let total = snapshot.total();
    info!(
        "{} users | {} requests | {} failures ({:.2}%) | avg {:.1}ms",
        users,
        total.count,
        total.failure_count,
        total.failure_rate() * 100.0,
        millis(total.mean_latency())
    );
    for (name, stats) in &snapshot.scenarios {
        info!(
            "  {:<36} {:>8} reqs {:>7} fails  avg {:>8.1}ms  min {:>8.1}ms  max {:>8.1}ms",
            name,
            stats.count,
            stats.failure_count,
            millis(stats.mean_latency()),
            millis(stats.min_latency),
            millis(stats.max_latency)
        );
    }
}

/// Resolve on Ctrl+C or once `run_time` has elapsed
async fn shutdown_signal(run_time: Option<Duration>) {
    let run_limit = async {
        match run_time {
            Some(limit) => tokio::time::sleep(limit).await,
            None => std::future::pending::<()>().await,
        }
    };

    tokio::select! {
        result = tokio::signal::ctrl_c() => match result {
            Ok(()) => info!("Ctrl+C received, stopping"),
            Err(e) => error!("Failed to listen for Ctrl+C: {}", e),
        },
        _ = run_limit => info!("Run time elapsed, stopping"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize Prometheus metrics recorder (must be done before any metrics are recorded)
    let prometheus_handle = setup_prometheus_metrics()?;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "loadgen=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration from environment
    let config = Config::from_env();
    config.validate().context("Invalid configuration")?;
    info!(
        "Loaded configuration: target={}, users={}, spawn_rate={}/s, wait={:?}..{:?}",
        config.target_url,
        config.users.target_user_count,
        config.users.spawn_rate,
        config.users.min_wait,
        config.users.max_wait
    );
    if let Some(run_time) = config.run.run_time {
        info!("Run time limited to {:?}", run_time);
    }

    // Scenarios, executor and statistics
    let scenarios = Arc::new(dispatch_scenarios().context("Failed to build scenarios")?);
    for (name, probability) in scenarios.probabilities() {
        info!("Scenario {:<36} p={:.3}", name, probability);
    }
    let stats = Arc::new(StatsAggregator::with_scenarios(scenarios.names()));

    let client = reqwest::Client::builder()
        .pool_max_idle_per_host(config.users.target_user_count)
        .build()
        .context("Failed to build HTTP client")?;
    let executor = Arc::new(HttpExecutor::with_client(client, config.target_url.clone()));

    let context = UserContext::new(scenarios, executor, Arc::clone(&stats));
    let pool = UserPool::new(context, UserSettings::from(&config))?;

    // Status endpoints
    let status_state =
        StatusState::new(pool.clone(), Arc::clone(&stats)).with_prometheus(prometheus_handle);
    let app = status_routes(status_state);
    let addr: SocketAddr = format!("{}:{}", config.status.host, config.status.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Status endpoints listening on {}", addr);
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("Status server failed: {}", e);
        }
    });

    pool.start(config.users.target_user_count, config.users.spawn_rate)?;

    // Fresh measurement window once the ramp completes
    if config.run.reset_stats_after_ramp {
        let ramp_pool = pool.clone();
        let ramp_stats = Arc::clone(&stats);
        tokio::spawn(async move {
            if ramp_pool.ramp_finished().await {
                ramp_stats.reset();
                info!("Ramp complete, statistics reset");
            }
        });
    }

    // Periodic summary and gauge update
    let report_pool = pool.clone();
    let report_stats = Arc::clone(&stats);
    let stats_interval = config.run.stats_interval;
    let reporter = tokio::spawn(async move {
        let mut interval = tokio::time::interval(stats_interval);
        interval.tick().await;
        loop {
            interval.tick().await;
            let users = report_pool.current_count();
            metrics::gauge!("loadgen_users_active").set(users as f64);
            log_snapshot(&report_stats.snapshot(), users);
        }
    });

    shutdown_signal(config.run.run_time).await;
    reporter.abort();

    match pool.stop(Shutdown::Graceful(config.run.stop_timeout)).await {
        Ok(()) => {}
        Err(PoolError::CancellationTimeout { remaining, timeout }) => {
            warn!(
                "{} users did not stop within {:?}, aborting them",
                remaining, timeout
            );
            pool.abort();
        }
        Err(e) => return Err(e.into()),
    }
    metrics::gauge!("loadgen_users_active").set(0.0);

    info!("Final statistics:");
    log_snapshot(&stats.snapshot(), 0);
    Ok(())
}
