//! Metrics collection and exposition.
//!
//! # Metrics
//! - `redirector_requests_total` (counter): requests by method, outcome, status
//! - `redirector_request_duration_seconds` (histogram): latency by outcome
//!
//! Outcomes are `redirect`, `proxy` and `not_found`.
//!
//! # Design Decisions
//! - Without an installed exporter the recording macros are no-ops
//! - The Prometheus endpoint is only started when an address is configured

use std::net::SocketAddr;
use std::time::Instant;

use axum::http::StatusCode;
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus exporter, serving scrapes on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

/// Record one handled request.
pub fn record_request(method: &str, outcome: &'static str, status: StatusCode, start: Instant) {
    metrics::counter!(
        "redirector_requests_total",
        "method" => method.to_string(),
        "outcome" => outcome,
        "status" => status.as_u16().to_string()
    )
    .increment(1);

    metrics::histogram!("redirector_request_duration_seconds", "outcome" => outcome)
        .record(start.elapsed().as_secs_f64());
}
