//! Common Test Utilities for Integration Tests
//!
//! An in-process dispatch target that behaves like the service the built-in
//! scenarios are written for, served on an ephemeral local port.

#![allow(dead_code)]

use axum::{
    Json, Router,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::net::TcpListener;

/// Requests seen by the test target
#[derive(Debug, Default)]
pub struct TargetHits {
    pub total: AtomicU64,
    /// Customer id to number of successful dispatches
    pub by_customer: DashMap<String, u64>,
    /// Requests that carried a `nonse` cache-buster
    pub with_nonse: AtomicU64,
}

impl TargetHits {
    pub fn total(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }

    pub fn customer(&self, customer: &str) -> u64 {
        self.by_customer.get(customer).map(|n| *n).unwrap_or(0)
    }
}

#[derive(Debug, Deserialize)]
struct DispatchQuery {
    customer: Option<String>,
    nonse: Option<String>,
}

#[derive(Debug, Serialize)]
struct DispatchResponse {
    customer: String,
    location: Option<String>,
}

async fn dispatch(
    State(hits): State<Arc<TargetHits>>,
    Query(query): Query<DispatchQuery>,
    headers: HeaderMap,
) -> Response {
    hits.total.fetch_add(1, Ordering::Relaxed);
    if query.nonse.is_some() {
        hits.with_nonse.fetch_add(1, Ordering::Relaxed);
    }

    let Some(customer) = query.customer else {
        return (
            StatusCode::BAD_REQUEST,
            "Missing required 'customer' parameter",
        )
            .into_response();
    };
    if headers.get("status").and_then(|v| v.to_str().ok()) == Some("error") {
        return (StatusCode::BAD_REQUEST, "Bad request from requestor").into_response();
    }

    *hits.by_customer.entry(customer.clone()).or_insert(0) += 1;
    let location = headers
        .get("location")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    Json(DispatchResponse { customer, location }).into_response()
}

async fn slow() -> &'static str {
    tokio::time::sleep(Duration::from_secs(5)).await;
    "late"
}

async fn server_error() -> StatusCode {
    StatusCode::INTERNAL_SERVER_ERROR
}

/// Create the dispatch target router
pub fn create_target_app() -> (Router, Arc<TargetHits>) {
    let hits = Arc::new(TargetHits::default());
    let app = Router::new()
        .route("/dispatch", get(dispatch))
        .route("/slow", get(slow))
        .route("/fail", get(server_error))
        .with_state(Arc::clone(&hits));
    (app, hits)
}

/// Serve the dispatch target on an ephemeral port, returning its base URL
pub async fn spawn_target() -> (String, Arc<TargetHits>) {
    let (app, hits) = create_target_app();
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test target");
    let addr = listener.local_addr().expect("Failed to read local address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });
    (format!("http://{}", addr), hits)
}

/// A base URL nothing is listening on
pub async fn unused_base_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind probe listener");
    let addr = listener.local_addr().expect("Failed to read local address");
    drop(listener);
    format!("http://{}", addr)
}
