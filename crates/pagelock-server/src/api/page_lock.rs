//! Page lock HTTP endpoints
//!
//! - GET    /api/page-locks/stream          live lock event stream
//! - GET    /api/page-locks                 list current locks
//! - POST   /api/page-locks/{pageId}/lock   lock a page
//! - DELETE /api/page-locks/{pageId}        unlock a page
//! - POST   /api/page-locks/{pageId}        unlock from an unload beacon

use std::convert::Infallible;
use std::sync::Arc;

use actix_web::{HttpRequest, HttpResponse, delete, get, http::header, post, web};
use pagelock_core::service::channel;
use serde::Deserialize;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info};

use crate::error::ApiError;
use crate::model::common::AppState;
use crate::model::constants::{EVENT_STREAM_CONTENT_TYPE, METHOD_OVERRIDE_FIELD, USER_ID_HEADER};

/// Form posted by `navigator.sendBeacon` when a page is closed
#[derive(Debug, Deserialize)]
struct BeaconForm {
    #[serde(rename = "_method")]
    method: Option<String>,
}

fn holder_of(req: &HttpRequest, data: &AppState) -> String {
    req.headers()
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| data.configuration.anonymous_holder())
}

/// GET /api/page-locks/stream
///
/// Streams `connected`, then one `page-locked` per current lock, then live
/// events and heartbeats until the client disconnects or the server stops.
#[get("/stream")]
pub async fn stream(data: web::Data<AppState>) -> HttpResponse {
    let service = data.service.clone();
    let (tx, rx) = channel(service.config().channel_capacity);
    let cancel = data.shutdown.child_token();

    actix_web::rt::spawn(async move {
        let subscriber_id = service.stream(Arc::new(tx), cancel).await;
        debug!(subscriber_id = %subscriber_id, "Event stream finished");
    });

    HttpResponse::Ok()
        .content_type(EVENT_STREAM_CONTENT_TYPE)
        .insert_header((header::CACHE_CONTROL, "no-cache"))
        .streaming(ReceiverStream::new(rx).map(Ok::<_, Infallible>))
}

/// GET /api/page-locks
#[get("")]
pub async fn list_locks(data: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(data.service.locks())
}

/// POST /api/page-locks/{pageId}/lock
///
/// The holder is taken from the `X-User-Id` header.
#[post("/{page_id}/lock")]
pub async fn lock_page(
    req: HttpRequest,
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let page_id = path.into_inner();
    let holder = holder_of(&req, &data);

    if data.service.lock(&page_id, &holder) {
        info!(page_id = %page_id, holder = %holder, "Page locked");
        Ok(HttpResponse::Ok().finish())
    } else {
        debug!(page_id = %page_id, holder = %holder, "Lock request rejected");
        Err(ApiError::AlreadyLocked(page_id))
    }
}

/// DELETE /api/page-locks/{pageId}
#[delete("/{page_id}")]
pub async fn unlock_page(data: web::Data<AppState>, path: web::Path<String>) -> HttpResponse {
    let page_id = path.into_inner();
    if data.service.unlock(&page_id) {
        info!(page_id = %page_id, "Page unlocked");
    }
    HttpResponse::Ok().finish()
}

/// POST /api/page-locks/{pageId}
///
/// Unlock sent by `navigator.sendBeacon`, which can only POST. The urlencoded
/// body must carry `_method=DELETE`.
#[post("/{page_id}")]
pub async fn unlock_beacon(
    data: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Bytes,
) -> Result<HttpResponse, ApiError> {
    let page_id = path.into_inner();

    let form: BeaconForm = serde_urlencoded::from_bytes(&body)
        .map_err(|e| ApiError::InvalidRequest(format!("unreadable form body: {}", e)))?;

    match form.method.as_deref() {
        Some("DELETE") => {
            if data.service.unlock(&page_id) {
                info!(page_id = %page_id, "Page unlocked by beacon");
            }
            Ok(HttpResponse::Ok().finish())
        }
        other => {
            debug!(page_id = %page_id, method = ?other, "Rejected beacon request");
            Err(ApiError::InvalidRequest(format!(
                "{} must be DELETE",
                METHOD_OVERRIDE_FIELD
            )))
        }
    }
}
