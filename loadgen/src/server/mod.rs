//! Status endpoints served alongside a running load test

pub mod routes;

pub use routes::{StatusState, status_routes};
