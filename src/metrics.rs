// =============================================================================
// METRICS MODULE
// =============================================================================
// Prometheus metrics for the ticket service.
//
// LEARNING NOTES:
// - Prometheus uses a "pull" model - it scrapes the /metrics endpoint
// - The `metrics` macros are no-ops until a recorder is installed, so the
//   helpers below are safe to call from tests
// =============================================================================

use anyhow::Result;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};

// =============================================================================
// METRIC NAMES
// =============================================================================

/// Labels: method, endpoint, status
pub const HTTP_REQUESTS_TOTAL: &str = "http_requests_total";

/// Labels: method, endpoint
pub const HTTP_REQUEST_DURATION_SECONDS: &str = "http_request_duration_seconds";

/// Reserve/release attempts. Labels: operation, outcome
pub const TICKET_SEAT_OPERATIONS_TOTAL: &str = "ticket_seat_operations_total";

/// Seats left per ticket. Labels: ticket_id
pub const TICKET_AVAILABLE_SEATS: &str = "ticket_available_seats";

/// Size of the most recent list result
pub const TICKETS_LISTED: &str = "tickets_listed";

/// Labels: operation (select/insert/update/delete)
pub const DB_QUERY_DURATION_SECONDS: &str = "db_query_duration_seconds";

/// Labels: operation (get/set/delete)
pub const REDIS_OPERATION_DURATION_SECONDS: &str = "redis_operation_duration_seconds";

/// Latency buckets from 1ms to 10s.
const LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

// =============================================================================
// SETUP
// =============================================================================
/// Install the global Prometheus recorder and describe every metric.
///
/// Returns the handle that renders the /metrics page.
pub fn setup_metrics() -> Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full(HTTP_REQUEST_DURATION_SECONDS.to_string()),
            LATENCY_BUCKETS,
        )?
        .set_buckets_for_metric(
            Matcher::Full(DB_QUERY_DURATION_SECONDS.to_string()),
            LATENCY_BUCKETS,
        )?
        .set_buckets_for_metric(
            Matcher::Full(REDIS_OPERATION_DURATION_SECONDS.to_string()),
            LATENCY_BUCKETS,
        )?
        .install_recorder()?;

    describe_counter!(HTTP_REQUESTS_TOTAL, "Total number of HTTP requests received");
    describe_histogram!(HTTP_REQUEST_DURATION_SECONDS, "HTTP request latency in seconds");
    describe_counter!(
        TICKET_SEAT_OPERATIONS_TOTAL,
        "Seat reserve/release attempts by outcome"
    );
    describe_gauge!(TICKET_AVAILABLE_SEATS, "Seats currently available per ticket");
    describe_gauge!(TICKETS_LISTED, "Number of tickets returned by the last list call");
    describe_histogram!(DB_QUERY_DURATION_SECONDS, "Database query latency in seconds");
    describe_histogram!(
        REDIS_OPERATION_DURATION_SECONDS,
        "Redis operation latency in seconds"
    );

    Ok(handle)
}

/// A handle backed by a recorder that is NOT installed globally.
///
/// Lets tests and embedders build an AppState without touching the global
/// recorder (which can only be installed once per process).
pub fn detached_handle() -> PrometheusHandle {
    PrometheusBuilder::new().build_recorder().handle()
}

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

pub fn record_http_request(method: &str, endpoint: &str, status: u16, duration_secs: f64) {
    counter!(
        HTTP_REQUESTS_TOTAL,
        "method" => method.to_string(),
        "endpoint" => endpoint.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    histogram!(
        HTTP_REQUEST_DURATION_SECONDS,
        "method" => method.to_string(),
        "endpoint" => endpoint.to_string()
    )
    .record(duration_secs);
}

/// Count a seat operation. `outcome` is "success" or the error code.
pub fn record_seat_operation(operation: &str, outcome: &str) {
    counter!(
        TICKET_SEAT_OPERATIONS_TOTAL,
        "operation" => operation.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

pub fn set_available_seats(ticket_id: &str, available: i32) {
    gauge!(TICKET_AVAILABLE_SEATS, "ticket_id" => ticket_id.to_string()).set(available as f64);
}

/// Zero the per-ticket gauge once the ticket is gone.
pub fn clear_available_seats(ticket_id: &str) {
    set_available_seats(ticket_id, 0);
}

pub fn set_tickets_listed(count: usize) {
    gauge!(TICKETS_LISTED).set(count as f64);
}

pub fn record_db_query(operation: &str, duration_secs: f64) {
    histogram!(DB_QUERY_DURATION_SECONDS, "operation" => operation.to_string())
        .record(duration_secs);
}

pub fn record_redis_operation(operation: &str, duration_secs: f64) {
    histogram!(REDIS_OPERATION_DURATION_SECONDS, "operation" => operation.to_string())
        .record(duration_secs);
}
