//! HTTP front end for the bracket engine.
//!
//! - [`api`]: Axum router, handlers and error mapping
//! - [`config`]: Environment and command-line configuration
//! - [`logging`]: Tracing subscriber setup
//! - [`metrics`]: Prometheus counters

pub mod api;
pub mod config;
pub mod logging;
pub mod metrics;
