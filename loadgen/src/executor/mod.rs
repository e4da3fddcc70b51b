//! Request executor module
//!
//! The load generator core only depends on the `RequestExecutor` contract.
//! `HttpExecutor` is the production implementation.

mod http;
mod service;
mod types;

pub use http::HttpExecutor;
pub use service::RequestExecutor;
pub use types::{ExecutorResponse, RequestError};
