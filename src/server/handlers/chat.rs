use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    response::{IntoResponse, Response},
};
use serde_json::Value;
use std::sync::Arc;

use crate::error::RelayError;
use crate::server::AppState;
use crate::server::validation::validate_chat_body;

const FAILURE_MESSAGE: &str = "OpenAI API request failed";

pub async fn chat_completions(
    State(app_state): State<Arc<AppState>>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Response, RelayError> {
    // 缺少 body、非 JSON 或 Content-Type 不对都算请求无效
    let Json(request) = body.map_err(|rejection| {
        tracing::debug!(error = %rejection, "rejected chat body");
        RelayError::InvalidRequest("invalid request body".into())
    })?;
    validate_chat_body(&request)?;

    let reply = app_state
        .openai
        .chat_completions(&request)
        .await
        .map_err(|failure| failure.into_relay_error(FAILURE_MESSAGE))?;

    Ok(reply.into_response())
}
