//! Health probes and metrics exposition

use actix_web::{HttpResponse, Responder, get, web};

use crate::error::ApiError;
use crate::model::common::AppState;
use crate::model::constants::PROMETHEUS_CONTENT_TYPE;

/// GET /health/liveness
///
/// Kubernetes-compatible liveness probe. Returns "ok" if the server process is alive.
#[get("/liveness")]
pub async fn liveness() -> impl Responder {
    HttpResponse::Ok().body("ok")
}

/// GET /health/readiness
///
/// Reports not ready once shutdown has begun.
#[get("/readiness")]
pub async fn readiness(data: web::Data<AppState>) -> impl Responder {
    if data.shutdown.is_shutdown() {
        return HttpResponse::ServiceUnavailable().body("shutting down");
    }
    HttpResponse::Ok().body("ok")
}

/// GET /metrics
#[get("/metrics")]
pub async fn metrics(data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let handle = data.metrics.as_ref().ok_or(ApiError::MetricsUnavailable)?;

    Ok(HttpResponse::Ok()
        .content_type(PROMETHEUS_CONTENT_TYPE)
        .body(handle.render()))
}
