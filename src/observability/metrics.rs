//! Metrics collection and exposition.
//!
//! # Metrics
//! - `tenant_router_decisions_total` (counter): routing decisions by outcome
//! - `tenant_router_requests_total` (counter): forwarded requests by method, status
//! - `tenant_router_request_duration_seconds` (histogram): end-to-end latency
//! - `tenant_router_config_reloads_total` (counter): reloads by result
//!
//! # Design Decisions
//! - Recording is a no-op until the exporter is installed
//! - Low-cardinality labels only; tenant names are logged, not labelled

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter with its own HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

/// Record a routing decision.
pub fn record_decision(outcome: &'static str) {
    counter!("tenant_router_decisions_total", "outcome" => outcome).increment(1);
}

/// Record a completed upstream request.
pub fn record_request(method: &str, status: u16, start: Instant) {
    counter!(
        "tenant_router_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("tenant_router_request_duration_seconds").record(start.elapsed().as_secs_f64());
}

/// Record the result of a configuration reload.
pub fn record_config_reload(success: bool) {
    let result = if success { "success" } else { "failure" };
    counter!("tenant_router_config_reloads_total", "result" => result).increment(1);
}
