//! RequestExecutor trait definition

use async_trait::async_trait;
use std::time::Duration;

use super::types::ExecutorResponse;
use crate::scenario::RequestSpec;

/// Sends one request and reports status, latency and error
///
/// Implementations are shared by every virtual user and must honor `timeout`,
/// returning a `Timeout` error instead of blocking past it.
#[async_trait]
pub trait RequestExecutor: Send + Sync {
    async fn execute(&self, spec: &RequestSpec, timeout: Duration) -> ExecutorResponse;
}
