// Route configuration
// Maps HTTP routes to handler functions

use actix_web::web;

use super::{health, page_lock};

/// Page lock API routes under /api/page-locks
pub fn page_lock_routes() -> actix_web::Scope {
    web::scope("/api/page-locks")
        .service(page_lock::stream)
        .service(page_lock::list_locks)
        .service(page_lock::lock_page)
        .service(page_lock::unlock_page)
        .service(page_lock::unlock_beacon)
}

/// Liveness and readiness probes under /health
pub fn health_routes() -> actix_web::Scope {
    web::scope("/health")
        .service(health::liveness)
        .service(health::readiness)
}

/// Register every route of the server
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(page_lock_routes())
        .service(health_routes())
        .service(health::metrics);
}
