//! Metrics collection and exposition.
//!
//! # Metrics
//! - `tcp_router_config_syncs_total` (counter): configuration syncs by outcome
//! - `tcp_router_config_sync_duration_seconds` (histogram): time spent in one sync
//! - `tcp_router_external_ports` (gauge): entries in the routing table
//! - `tcp_router_mapping_requests_total` (counter): mapping API calls by result

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape listener on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

/// Record one configuration sync attempt.
pub fn record_config_sync(success: bool, start_time: Instant) {
    let outcome = if success { "success" } else { "failure" };
    counter!("tcp_router_config_syncs_total", "outcome" => outcome).increment(1);
    histogram!("tcp_router_config_sync_duration_seconds").record(start_time.elapsed().as_secs_f64());
}

pub fn record_routing_table_size(entries: usize) {
    gauge!("tcp_router_external_ports").set(entries as f64);
}

/// `result` is one of `changed`, `unchanged`, `invalid`, `error`.
pub fn record_mapping_request(result: &'static str) {
    counter!("tcp_router_mapping_requests_total", "result" => result).increment(1);
}
