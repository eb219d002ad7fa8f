//! Metric emission.
//!
//! # Metrics
//! - `courier_connections_total` (counter): accepted connections
//! - `courier_connections_closed_total` (counter): finished connections
//! - `courier_responses_total` (counter): responses written, by status
//! - `courier_handler_failures_total` (counter): reply slots dropped
//!   without a response
//!
//! No recorder is installed here; the embedding application decides
//! whether and where these are exported.

use metrics::counter;

pub fn record_connection_opened() {
    counter!("courier_connections_total").increment(1);
}

pub fn record_connection_closed() {
    counter!("courier_connections_closed_total").increment(1);
}

pub fn record_request(status: u16) {
    counter!("courier_responses_total", "status" => status.to_string()).increment(1);
}

pub fn record_handler_failure() {
    counter!("courier_handler_failures_total").increment(1);
}
