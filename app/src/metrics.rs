//! Service metrics.
//!
//! # Exported Metrics
//!
//! ## Counters
//! - `rsvp_events_created_total` - Events persisted by the creation flow
//! - `rsvp_attendance_toggles_total{direction}` - RSVPs (`join`) and cancellations (`leave`)
//! - `rsvp_event_queries_total{shape}` - Event reads by shape (`public`, `organizing`, `attending`, `single`)
//! - `rsvp_backend_errors_total{operation}` - Failed `PostgreSQL` statements
//! - `rsvp_http_requests_total{method,status}` - Served HTTP requests
//! - `rsvp_store_actions_total` - Actions reduced by board stores

use metrics::describe_counter;

/// Register all metric descriptions.
///
/// Call once at startup, after the recorder is installed.
pub fn register_metrics() {
    describe_counter!(
        "rsvp_events_created_total",
        "Total number of events created"
    );
    describe_counter!(
        "rsvp_attendance_toggles_total",
        "Total number of attendance toggles by direction (join, leave)"
    );
    describe_counter!(
        "rsvp_event_queries_total",
        "Total number of event queries by shape (public, organizing, attending, single)"
    );
    describe_counter!(
        "rsvp_backend_errors_total",
        "Total number of failed backend operations by operation"
    );
    describe_counter!(
        "rsvp_http_requests_total",
        "Total number of HTTP requests by method and status"
    );
    describe_counter!(
        "rsvp_store_actions_total",
        "Total number of actions reduced by stores"
    );

    tracing::info!("Metrics registered");
}
