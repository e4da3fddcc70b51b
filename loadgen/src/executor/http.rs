//! HTTP executor backed by reqwest

use async_trait::async_trait;
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::trace;

use super::service::RequestExecutor;
use super::types::{ExecutorResponse, RequestError};
use crate::scenario::{Method, RequestSpec};

/// Executor sending requests to a fixed base URL
///
/// A single `reqwest::Client` (and its connection pool) is shared by every
/// virtual user.
#[derive(Debug, Clone)]
pub struct HttpExecutor {
    client: Client,
    base_url: String,
}

impl HttpExecutor {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for a scenario path
    fn url_for(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }
}

fn to_reqwest(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Delete => reqwest::Method::DELETE,
        Method::Patch => reqwest::Method::PATCH,
        Method::Head => reqwest::Method::HEAD,
    }
}

#[async_trait]
impl RequestExecutor for HttpExecutor {
    async fn execute(&self, spec: &RequestSpec, timeout: Duration) -> ExecutorResponse {
        let url = self.url_for(&spec.path);
        let query: Vec<(&str, &str)> = spec
            .query
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();

        let mut request = self
            .client
            .request(to_reqwest(spec.method), &url)
            .query(&query)
            .timeout(timeout);
        for (name, value) in &spec.headers {
            request = request.header(name, value);
        }

        let start = Instant::now();
        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                trace!("{} {} failed: {}", spec.method, url, e);
                return ExecutorResponse::failed(RequestError::from_reqwest(&e), start.elapsed());
            }
        };

        let status = response.status().as_u16();
        // Latency includes reading the body
        if let Err(e) = response.bytes().await {
            return ExecutorResponse {
                status: Some(status),
                elapsed: start.elapsed(),
                error: Some(RequestError::from_reqwest(&e)),
            };
        }

        ExecutorResponse::from_status(status, start.elapsed())
    }
}
