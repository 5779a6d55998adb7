// Metrics module for observability
// Registers descriptions for the lock metrics and installs the Prometheus recorder

use metrics::{describe_counter, describe_gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use pagelock_core::metrics::{
    BROADCAST_TOTAL, LOCK_ACQUIRE_TOTAL, LOCK_RELEASE_TOTAL, LOCKS_ACTIVE, SUBSCRIBER_PRUNED_TOTAL,
    SUBSCRIBERS_ACTIVE,
};
use tracing::warn;

/// Install the global Prometheus recorder and describe all metrics.
///
/// Should be called once at application startup. Returns `None` if a recorder
/// is already installed; metrics are then not rendered at `/metrics`.
pub fn init_metrics() -> Option<PrometheusHandle> {
    let handle = match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => Some(handle),
        Err(e) => {
            warn!(error = %e, "Failed to install Prometheus recorder");
            None
        }
    };

    describe_metrics();
    handle
}

pub fn describe_metrics() {
    describe_counter!(
        LOCK_ACQUIRE_TOTAL,
        "Total number of lock requests, by outcome"
    );
    describe_counter!(
        LOCK_RELEASE_TOTAL,
        "Total number of unlock requests, by outcome"
    );
    describe_gauge!(LOCKS_ACTIVE, "Number of pages currently locked");

    describe_gauge!(SUBSCRIBERS_ACTIVE, "Number of connected event stream subscribers");
    describe_counter!(
        SUBSCRIBER_PRUNED_TOTAL,
        "Total number of subscribers dropped after a failed write"
    );
    describe_counter!(
        BROADCAST_TOTAL,
        "Total number of lock events broadcast, by event"
    );
}
