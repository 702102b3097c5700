//! Business metrics for the box office.
//!
//! # Exported Metrics
//!
//! ## Counters
//! - `boxoffice_datagrams_total{kind}` - Requests by type, plus `malformed`
//! - `boxoffice_bad_requests_total{reason}` - `BAD_REQUEST` replies by cause
//! - `boxoffice_reservations_total{status}` - Reservations granted, refused, realized, expired
//! - `boxoffice_tickets_issued_total` - Ticket codes issued

use metrics::describe_counter;

/// Register descriptions for all business metrics.
///
/// Call once at startup, after the recorder is installed.
pub fn register_business_metrics() {
    describe_counter!(
        "boxoffice_datagrams_total",
        "Datagrams handled by the dispatcher, by request kind"
    );
    describe_counter!(
        "boxoffice_bad_requests_total",
        "BAD_REQUEST replies, by refusal reason"
    );
    describe_counter!(
        "boxoffice_reservations_total",
        "Reservation lifecycle transitions (granted, refused, realized, expired)"
    );
    describe_counter!(
        "boxoffice_tickets_issued_total",
        "Ticket codes issued"
    );

    tracing::info!("Business metrics registered");
}

// ============================================================================
// Metric Recording Functions
// ============================================================================

/// Record one handled datagram of `kind`.
pub fn record_datagram(kind: &'static str) {
    metrics::counter!("boxoffice_datagrams_total", "kind" => kind).increment(1);
}

/// Record a `BAD_REQUEST` reply.
pub fn record_bad_request(reason: &'static str) {
    metrics::counter!("boxoffice_bad_requests_total", "reason" => reason).increment(1);
}

/// Record a reservation lifecycle transition.
pub fn record_reservation(status: &'static str) {
    metrics::counter!("boxoffice_reservations_total", "status" => status).increment(1);
}

/// Record reservations expired by a sweep.
pub fn record_expired(count: usize) {
    metrics::counter!("boxoffice_reservations_total", "status" => "expired")
        .increment(u64::try_from(count).unwrap_or(u64::MAX));
}

/// Record freshly issued ticket codes.
pub fn record_tickets_issued(count: u64) {
    metrics::counter!("boxoffice_tickets_issued_total").increment(count);
    tracing::trace!(count, "Recorded tickets_issued metric");
}
