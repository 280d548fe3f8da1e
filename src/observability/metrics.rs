//! Metrics collection and exposition.
//!
//! # Metrics
//! - `dynroute_compilations_total` (counter): compiler runs by outcome
//! - `dynroute_compile_duration_seconds` (histogram): compiler wall time
//! - `dynroute_artifact_reuse_total` (counter): units served from an existing artifact
//! - `dynroute_routes_registered_total` (counter): registrations by verb
//! - `dynroute_requests_total` (counter): requests by method, status
//! - `dynroute_request_duration_seconds` (histogram): handler latency

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Start the Prometheus scrape endpoint on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_compilation(outcome: &str, started: Instant) {
    ::metrics::counter!("dynroute_compilations_total", "outcome" => outcome.to_string()).increment(1);
    ::metrics::histogram!("dynroute_compile_duration_seconds", "outcome" => outcome.to_string())
        .record(started.elapsed().as_secs_f64());
}

pub fn record_artifact_reuse() {
    ::metrics::counter!("dynroute_artifact_reuse_total").increment(1);
}

pub fn record_route_registered(verb: &str) {
    ::metrics::counter!("dynroute_routes_registered_total", "verb" => verb.to_string()).increment(1);
}

pub fn record_request(method: &str, status: u16, started: Instant) {
    let status = status.to_string();
    ::metrics::counter!(
        "dynroute_requests_total",
        "method" => method.to_string(),
        "status" => status.clone()
    )
    .increment(1);
    ::metrics::histogram!(
        "dynroute_request_duration_seconds",
        "method" => method.to_string(),
        "status" => status
    )
    .record(started.elapsed().as_secs_f64());
}
