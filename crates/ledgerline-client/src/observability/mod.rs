//! Observability setup for the Ledgerline client.
//!
//! This module provides:
//! - Structured logging configuration
//! - Metric descriptions for the request layer

mod logging;

pub use logging::{init_logging, LoggingConfig};

/// Registers descriptions for every metric the client records.
///
/// Optional; call once at startup after installing a metrics recorder.
pub fn register_client_metrics() {
    ledgerline_domain::cache::register_response_cache_metrics();
    metrics::describe_counter!(
        "ledgerline_requests_total",
        "Total number of network requests sent, by method"
    );
    metrics::describe_counter!(
        "ledgerline_request_failures_total",
        "Total number of failed requests (network or non-2xx)"
    );
    metrics::describe_counter!(
        "ledgerline_singleflight_coalesced_total",
        "Total number of callers served by another caller's in-flight request"
    );
}
