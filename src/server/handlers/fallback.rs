use std::any::Any;

use axum::http::StatusCode;
use axum::response::Response;

use crate::error::{RelayError, json_error};

pub async fn not_found() -> RelayError {
    RelayError::NotFound
}

pub async fn options_ok() -> StatusCode {
    StatusCode::NO_CONTENT
}

/// Response for a panic caught by `CatchPanicLayer`; the panic text stays in the log.
pub fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.as_str()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s
    } else {
        "unknown panic payload"
    };
    tracing::error!(panic = detail, "unhandled panic in request handler");
    json_error(StatusCode::INTERNAL_SERVER_ERROR, "unexpected error")
}
