//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gate_auth_failures_total` (counter): bearer token rejections by reason
//! - `gate_webhook_rejections_total` (counter): webhook rejections by reason
//! - `gate_audit_events_total` (counter): audit entries by event type
//! - `gate_log_write_failures_total` (counter): failed log file appends
//!
//! # Design Decisions
//! - Low-overhead metric updates; no-ops until a recorder is installed
//! - Labels are static strings, never caller-controlled values

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_auth_failure(reason: &'static str) {
    metrics::counter!("gate_auth_failures_total", "reason" => reason).increment(1);
}

pub fn record_webhook_rejection(reason: &'static str) {
    metrics::counter!("gate_webhook_rejections_total", "reason" => reason).increment(1);
}

pub fn record_audit_event(event: &'static str) {
    metrics::counter!("gate_audit_events_total", "event" => event).increment(1);
}

pub fn record_log_write_failure() {
    metrics::counter!("gate_log_write_failures_total").increment(1);
}
