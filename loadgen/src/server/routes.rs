//! HTTP route handlers for the status API

use axum::{
    Json, Router,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tower_http::trace::TraceLayer;

use crate::pool::{RampPhase, UserPool};
use crate::stats::{StatsAggregator, StatsSnapshot};

/// State shared by the status handlers
#[derive(Clone)]
pub struct StatusState {
    pub pool: UserPool,
    pub stats: Arc<StatsAggregator>,
    pub started_at: Instant,
    /// Absent when no Prometheus recorder is installed
    pub prometheus: Option<PrometheusHandle>,
}

impl StatusState {
    pub fn new(pool: UserPool, stats: Arc<StatsAggregator>) -> Self {
        Self {
            pool,
            stats,
            started_at: Instant::now(),
            prometheus: None,
        }
    }

    pub fn with_prometheus(mut self, handle: PrometheusHandle) -> Self {
        self.prometheus = Some(handle);
        self
    }
}

/// Response for GET /health
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    /// Users currently Running or Stopping
    pub users: usize,
    pub ramp: RampPhase,
    pub total_requests: u64,
    pub uptime_seconds: u64,
}

/// GET /health
pub async fn health(State(state): State<StatusState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        users: state.pool.current_count(),
        ramp: state.pool.ramp_phase(),
        total_requests: state.stats.total_requests(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
    })
}

/// GET /stats - Per-scenario statistics snapshot
pub async fn stats_snapshot(State(state): State<StatusState>) -> Json<StatsSnapshot> {
    Json(state.stats.snapshot())
}

/// GET /metrics/prometheus
pub async fn prometheus_metrics(State(state): State<StatusState>) -> Response {
    match state.prometheus {
        Some(ref handle) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        )
            .into_response(),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            "Prometheus recorder not installed",
        )
            .into_response(),
    }
}

/// Create the status router
pub fn status_routes(state: StatusState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/stats", get(stats_snapshot))
        .route("/metrics/prometheus", get(prometheus_metrics))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
