//! Prometheus metrics for the bracket server.
//!
//! Counters are no-ops until [`init_metrics`] installs the exporter, so
//! handlers can record unconditionally.
//!
//! ```rust,no_run
//! use bracket_server::metrics;
//! use std::net::SocketAddr;
//!
//! let addr: SocketAddr = "127.0.0.1:9090".parse().unwrap();
//! metrics::init_metrics(addr).unwrap();
//!
//! metrics::brackets_generated_total();
//! ```

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Start a Prometheus scrape endpoint at `http://<addr>/metrics`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {}", e))
}

// ============================================================================
// HTTP Metrics
// ============================================================================

/// Record HTTP request with method, path, and status labels.
pub fn http_requests_total(method: &str, path: &str, status: u16) {
    metrics::counter!("http_requests_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record HTTP request duration in milliseconds.
pub fn http_request_duration_ms(method: &str, path: &str, duration_ms: f64) {
    metrics::histogram!("http_request_duration_ms",
        "method" => method.to_string(),
        "path" => path.to_string()
    )
    .record(duration_ms);
}

// ============================================================================
// Bracket Metrics
// ============================================================================

pub fn brackets_generated_total() {
    metrics::counter!("brackets_generated_total").increment(1);
}

/// Record bracket size distribution.
pub fn bracket_participants(count: usize) {
    metrics::histogram!("bracket_participants").record(count as f64);
}

pub fn match_results_recorded_total() {
    metrics::counter!("match_results_recorded_total").increment(1);
}

pub fn match_results_cleared_total() {
    metrics::counter!("match_results_cleared_total").increment(1);
}

pub fn tournaments_completed_total() {
    metrics::counter!("tournaments_completed_total").increment(1);
}
