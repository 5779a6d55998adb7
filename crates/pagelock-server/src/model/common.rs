// Shared application state handed to every request handler

use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusHandle;
use pagelock_core::PageLockService;

use super::config::Configuration;
use crate::startup::ShutdownSignal;

/// Application state shared across all HTTP workers
#[derive(Clone)]
pub struct AppState {
    pub configuration: Configuration,
    pub service: Arc<PageLockService>,
    pub shutdown: ShutdownSignal,
    /// Present when a Prometheus recorder was installed at startup
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(
        configuration: Configuration,
        service: Arc<PageLockService>,
        shutdown: ShutdownSignal,
        metrics: Option<PrometheusHandle>,
    ) -> Self {
        Self {
            configuration,
            service,
            shutdown,
            metrics,
        }
    }

    /// State with default configuration and no metrics recorder
    pub fn with_defaults() -> Self {
        let configuration = Configuration::default();
        let service = Arc::new(PageLockService::new(configuration.stream_config()));
        Self::new(configuration, service, ShutdownSignal::new(), None)
    }
}
