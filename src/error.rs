use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("{message} (upstream status {status})")]
    Upstream {
        status: StatusCode,
        message: &'static str,
        details: Value,
    },

    #[error("Upstream unavailable")]
    UpstreamUnavailable,

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Not found")]
    NotFound,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, RelayError>;

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Value>,
}

/// `{error}` envelope with the given status.
pub fn json_error(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(ErrorBody {
            error: message,
            details: None,
        }),
    )
        .into_response()
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        match self {
            RelayError::InvalidRequest(message) => json_error(StatusCode::BAD_REQUEST, &message),
            RelayError::Upstream {
                status,
                message,
                details,
            } => (
                status,
                Json(ErrorBody {
                    error: message,
                    details: Some(details),
                }),
            )
                .into_response(),
            RelayError::UpstreamUnavailable => {
                json_error(StatusCode::SERVICE_UNAVAILABLE, "service unavailable")
            }
            RelayError::NotFound => json_error(StatusCode::NOT_FOUND, "not found"),
            other => {
                // 细节只写日志，不回显给客户端
                tracing::error!(error = %other, "request failed with internal error");
                json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal error")
            }
        }
    }
}
