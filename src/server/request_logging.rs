use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use chrono::Utc;
use tracing::{error, info, warn};

const STATUS_PATH: &str = "/api/status";

// 记录每个请求的方法、路径、状态码与耗时（不含查询串，避免把检索词写进日志）
pub async fn log_requests(req: Request, next: Next) -> Response {
    let path = req.uri().path().to_string();

    // 健康检查太频繁，不记录
    if path == STATUS_PATH {
        return next.run(req).await;
    }

    let method = req.method().to_string();
    let start_time = Utc::now();

    let response = next.run(req).await;

    let status = response.status().as_u16();
    let response_time_ms = (Utc::now() - start_time).num_milliseconds();

    match status {
        500.. => error!(method, path, status, response_time_ms, "request"),
        400..=499 => warn!(method, path, status, response_time_ms, "request"),
        _ => info!(method, path, status, response_time_ms, "request"),
    }

    response
}
