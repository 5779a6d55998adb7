//! Main entry point for the page lock server.
//!
//! Loads configuration, sets up logging and metrics, then serves the page lock
//! API until Ctrl+C or SIGTERM.

use std::sync::Arc;

use pagelock_core::PageLockService;
use pagelock_server::{
    model::{common::AppState, config::Configuration},
    startup,
};
use tracing::info;

#[actix_web::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let configuration = Configuration::new()?;

    let logging_config = configuration.logging_config();
    let _logging_guard = startup::init_logging(&logging_config)?;

    let metrics_handle = pagelock_server::metrics::init_metrics();

    let service = Arc::new(PageLockService::new(configuration.stream_config()));

    // Initialize graceful shutdown handler
    let shutdown_signal = startup::wait_for_shutdown_signal().await;

    let server_address = configuration.server_address();
    let server_port = configuration.server_port();
    let shutdown_timeout = configuration.shutdown_timeout();

    let app_state = Arc::new(AppState::new(
        configuration,
        service.clone(),
        shutdown_signal.clone(),
        metrics_handle,
    ));

    info!("Starting page lock server on {}:{}", server_address, server_port);
    let server = startup::main_server(app_state, server_address, server_port, shutdown_timeout)?;
    let result = startup::serve_until_shutdown(server, &shutdown_signal, &service).await;

    info!("Page lock server shutdown complete");
    Ok(result?)
}
