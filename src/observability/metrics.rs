//! Metrics collection and exposition.
//!
//! # Metrics
//! - `bridge_requests_total` (counter): completed requests by outcome
//! - `bridge_request_duration_seconds` (histogram): submit-to-completion latency
//! - `bridge_in_flight` (gauge): requests currently owned by dispatchers
//! - `bridge_malformed_frames_total` (counter): dropped inbound frames
//! - `bridge_reconnects_total` (counter): control channel dials after the first

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Start the Prometheus scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to start metrics endpoint"),
    }
}

/// Record a finished request. `outcome` is `ok` or an error kind label.
pub fn record_completion(outcome: &'static str, start: Instant) {
    counter!("bridge_requests_total", "outcome" => outcome).increment(1);
    histogram!("bridge_request_duration_seconds").record(start.elapsed().as_secs_f64());
}

pub fn record_in_flight(count: usize) {
    gauge!("bridge_in_flight").set(count as f64);
}

pub fn record_malformed_frame() {
    counter!("bridge_malformed_frames_total").increment(1);
}

pub fn record_reconnect() {
    counter!("bridge_reconnects_total").increment(1);
}
