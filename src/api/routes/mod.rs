use axum::{http::StatusCode, Json};
use serde::Serialize;

use crate::error::LivePulseError;

pub mod health;
pub mod state;
pub mod status;
pub mod videos;

/// Error response structure with user-friendly message
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

pub(crate) fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

/// Log line for a failed store call. Only the error kind is logged.
pub(crate) fn store_failure(context: &str, e: &LivePulseError) -> String {
    format!("{}: {} error", context, e.category())
}
