//! HTTP server setup.

use std::sync::Arc;
use std::time::Duration;

use actix_web::{App, HttpServer, dev::Server, middleware::Logger, web};
use pagelock_core::PageLockService;
use tracing::{error, info};

use super::shutdown::ShutdownSignal;
use crate::{api::route, model::common::AppState};

/// Creates and binds the main HTTP server.
///
/// OS signal handling is left to [`wait_for_shutdown_signal`](super::wait_for_shutdown_signal)
/// so event streams can be closed before the server stops.
pub fn main_server(
    app_state: Arc<AppState>,
    address: String,
    port: u16,
    shutdown_timeout: Duration,
) -> Result<Server, std::io::Error> {
    Ok(HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(web::Data::from(app_state.clone()))
            .configure(route::configure)
    })
    .disable_signals()
    .shutdown_timeout(shutdown_timeout.as_secs())
    .bind((address, port))?
    .run())
}

/// Runs `server` until it exits on its own or `shutdown` fires.
///
/// On shutdown the event streams are closed first, then the server is stopped
/// gracefully. The server future keeps being polled while it drains, so
/// in-flight requests get the configured shutdown timeout.
pub async fn serve_until_shutdown(
    server: Server,
    shutdown: &ShutdownSignal,
    service: &PageLockService,
) -> std::io::Result<()> {
    let handle = server.handle();
    tokio::pin!(server);

    let result = tokio::select! {
        result = &mut server => result,
        _ = shutdown.cancelled() => {
            info!(
                subscribers = service.subscriber_count(),
                "Closing event streams and stopping HTTP server"
            );
            service.shutdown();
            let (_, result) = tokio::join!(handle.stop(true), &mut server);
            result
        }
    };

    if let Err(e) = &result {
        error!("Server error: {}", e);
    }
    result
}
