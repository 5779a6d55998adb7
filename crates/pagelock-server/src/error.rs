// Error responses for the page lock HTTP API
// Every error renders as {"message": "..."} with a matching status code

use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde::Serialize;

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    /// Lock request for a page somebody already holds; carries the page id
    #[error("Page is already locked")]
    AlreadyLocked(String),

    /// Malformed request; carries the reason for the log
    #[error("Invalid request")]
    InvalidRequest(String),

    #[error("Metrics are not available")]
    MetricsUnavailable,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    message: String,
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::AlreadyLocked(_) => StatusCode::CONFLICT,
            ApiError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::MetricsUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorBody {
            message: self.to_string(),
        })
    }
}
