//! Metrics collection and exposition.
//!
//! # Metrics
//! - `dispatch_requests_total` (counter): requests by method, status, route
//! - `dispatch_request_duration_seconds` (histogram): latency by route
//! - `route_table_size` (gauge): routes in the active table
//!
//! # Design Decisions
//! - Recording is a no-op until `init_metrics` installs a recorder
//! - Route label is the pattern, never the raw path (bounded cardinality)

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::observability::ObservabilityError;

/// Install the Prometheus exporter listening on `address`.
pub fn init_metrics(address: &str) -> Result<(), ObservabilityError> {
    let addr: SocketAddr = address
        .parse()
        .map_err(|_| ObservabilityError::InvalidAddress(address.to_string()))?;

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| ObservabilityError::Exporter(e.to_string()))?;

    describe_counter!("dispatch_requests_total", "Total requests dispatched");
    describe_histogram!(
        "dispatch_request_duration_seconds",
        "Time from dispatch start to response"
    );
    describe_gauge!("route_table_size", "Routes in the active route table");

    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

/// Record one dispatched request.
pub fn record_request(method: &str, status: u16, route: &str, start: Instant) {
    counter!(
        "dispatch_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
        "route" => route.to_string()
    )
    .increment(1);

    histogram!(
        "dispatch_request_duration_seconds",
        "route" => route.to_string()
    )
    .record(start.elapsed().as_secs_f64());
}

pub fn set_route_table_size(size: usize) {
    gauge!("route_table_size").set(size as f64);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_address() {
        assert!(matches!(
            init_metrics("not-an-address"),
            Err(ObservabilityError::InvalidAddress(_))
        ));
    }

    #[test]
    fn test_recording_without_recorder_is_noop() {
        record_request("GET", 200, "/users/:id", Instant::now());
        set_route_table_size(3);
    }
}
