//! Metrics collection and exposition.
//!
//! # Metrics
//! - `real_ip_resolutions_total` (counter): outcomes by strategy, `found` or `absent`
//! - `real_ip_requests_total` (counter): handled requests by method, status
//! - `real_ip_request_duration_seconds` (histogram): latency distribution

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::retrieval::Strategy;

/// Install the Prometheus recorder and its scrape listener.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

/// Record the outcome of one retrieval.
pub fn record_resolution(strategy: Strategy, found: bool) {
    let outcome = if found { "found" } else { "absent" };
    metrics::counter!(
        "real_ip_resolutions_total",
        "strategy" => strategy.as_str(),
        "outcome" => outcome
    )
    .increment(1);
}

/// Record a completed request.
pub fn record_request(method: &str, status: u16, start: Instant) {
    let method = method.to_string();
    metrics::counter!(
        "real_ip_requests_total",
        "method" => method.clone(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("real_ip_request_duration_seconds", "method" => method)
        .record(start.elapsed().as_secs_f64());
}
