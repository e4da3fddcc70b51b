//! Executor result and error types

use std::time::Duration;
use thiserror::Error;

/// Request-level failures. These are expected during a run and are always
/// recorded as failed outcomes rather than propagated.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RequestError {
    /// The request exceeded its timeout
    #[error("Request timed out")]
    Timeout,

    /// DNS resolution, TCP connect or TLS handshake failed
    #[error("Connection error: {0}")]
    Connection(String),

    /// The target answered with a non-2xx status
    #[error("HTTP {status}")]
    Status { status: u16 },

    /// Anything else (malformed URL, body read failure, ...)
    #[error("Request failed: {0}")]
    Other(String),
}

impl RequestError {
    /// Failure category used as the stats key
    ///
    /// Categories: `"timeout"`, `"connection"`, `"http_<status>"`, `"other"`.
    pub fn category(&self) -> String {
        match self {
            Self::Timeout => "timeout".to_string(),
            Self::Connection(_) => "connection".to_string(),
            Self::Status { status } => format!("http_{status}"),
            Self::Other(_) => "other".to_string(),
        }
    }

    /// Classify a [`reqwest::Error`]
    pub fn from_reqwest(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_connect() {
            Self::Connection(err.to_string())
        } else if let Some(status) = err.status() {
            Self::Status {
                status: status.as_u16(),
            }
        } else {
            Self::Other(err.to_string())
        }
    }
}

/// What an executor reports for one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutorResponse {
    /// Status code, if a response was received at all
    pub status: Option<u16>,
    pub elapsed: Duration,
    pub error: Option<RequestError>,
}

impl ExecutorResponse {
    /// A response with a status code; non-2xx statuses carry a `Status` error
    pub fn from_status(status: u16, elapsed: Duration) -> Self {
        let error = if (200..300).contains(&status) {
            None
        } else {
            Some(RequestError::Status { status })
        };
        Self {
            status: Some(status),
            elapsed,
            error,
        }
    }

    /// A request that never produced a response
    pub fn failed(error: RequestError, elapsed: Duration) -> Self {
        Self {
            status: None,
            elapsed,
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}
