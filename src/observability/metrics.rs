//! Metrics collection and exposition.
//!
//! # Metrics
//! - `control_http_requests_total` (counter): requests by method, route, status
//! - `control_http_request_duration_seconds` (histogram): latency distribution
//! - `control_reload_total` (counter): reload attempts by outcome
//! - `control_store_errors_total` (counter): store failures by operation

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Instant;

/// Start the Prometheus scrape endpoint. Must run inside the tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, route: &str, status: u16, start: Instant) {
    let labels = [
        ("method", method.to_string()),
        ("route", route.to_string()),
        ("status", status.to_string()),
    ];
    counter!("control_http_requests_total", &labels).increment(1);
    histogram!("control_http_request_duration_seconds", &labels)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_reload(outcome: &'static str) {
    counter!("control_reload_total", "outcome" => outcome).increment(1);
}

pub fn record_store_error(op: &'static str) {
    counter!("control_store_errors_total", "op" => op).increment(1);
}
