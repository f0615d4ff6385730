use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

pub const ERROR_GENERIC: u32 = 1000;
pub const ERROR_CONFIGURATION_NOT_READY: u32 = 1001;

/// JSON error body returned by every failing endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorReply {
    pub code: u32,
    pub message: String,
}

pub fn reply_with_error(status: StatusCode, code: u32, message: &str) -> Response {
    (
        status,
        Json(ErrorReply {
            code,
            message: message.to_string(),
        }),
    )
        .into_response()
}

pub fn generic_error() -> Response {
    reply_with_error(StatusCode::INTERNAL_SERVER_ERROR, ERROR_GENERIC, "generic error")
}

/// The local machine has no address assigned yet. Membership requests fail
/// fast instead of returning a misleading empty list.
pub fn configuration_not_ready() -> Response {
    reply_with_error(
        StatusCode::SERVICE_UNAVAILABLE,
        ERROR_CONFIGURATION_NOT_READY,
        "configuration not ready: no machine address assigned",
    )
}
