use axum::{
    Router,
    routing::{MethodRouter, get, post},
};
use std::sync::Arc;

use crate::server::AppState;

mod chat;
pub(crate) mod fallback;
mod pubmed;
mod status;

// 已定义路径上的其他方法也按 404 处理；非预检的 OPTIONS 直接 204
fn endpoint(method_router: MethodRouter<Arc<AppState>>) -> MethodRouter<Arc<AppState>> {
    method_router
        .options(fallback::options_ok)
        .fallback(fallback::not_found)
}

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", endpoint(get(status::root)))
        .route("/api/status", endpoint(get(status::status)))
        .route("/api/openai", endpoint(post(chat::chat_completions)))
        .route("/api/pubmed/search", endpoint(get(pubmed::search)))
        .route("/api/pubmed/summary", endpoint(get(pubmed::summary)))
        .route("/api/pubmed/fetch", endpoint(get(pubmed::fetch)))
        .fallback(fallback::not_found)
}
