pub mod handlers;
pub(crate) mod request_logging;
pub mod validation;

use crate::config::{CorsConfig, Settings};
use crate::error::{RelayError, Result as AppResult};
use crate::providers::{OpenAIProvider, PubmedProvider};
use axum::Router;
use axum::extract::Request;
use axum::http::{HeaderValue, Method, header};
use std::sync::Arc;
use tower::{ServiceBuilder, ServiceExt};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Read-only state shared by every request.
#[derive(Clone)]
pub struct AppState {
    pub config: Settings,
    pub openai: OpenAIProvider,
    pub pubmed: PubmedProvider,
}

pub async fn create_app(config: Settings) -> AppResult<Router> {
    config.validate()?;

    let openai = OpenAIProvider::from_config(&config.openai)?;
    let pubmed = PubmedProvider::from_config(&config.pubmed)?;

    if !openai.has_api_key() {
        tracing::warn!("OPENAI_API_KEY is not set; /api/openai will answer 500");
    }
    if !pubmed.has_api_key() {
        tracing::info!("PUBMED_API_KEY is not set; E-utilities calls run at the anonymous rate limit");
    }
    tracing::info!(
        openai = openai.upstream().base_url(),
        pubmed = pubmed.upstream().base_url(),
        openai_timeout_ms = config.openai.timeout_ms,
        pubmed_timeout_ms = config.pubmed.timeout_ms,
        "upstreams configured"
    );

    let cors = cors_layer(&config.cors)?;
    tracing::info!(origins = ?config.cors.allowed_origins, "CORS origins configured");

    let app_state = AppState {
        config,
        openai,
        pubmed,
    };

    let app = handlers::routes().with_state(Arc::new(app_state));
    Ok(with_policy(app, cors))
}

// CORS：白名单来源（或 "*"）。通配符与 credentials 的组合已由 Settings::validate 拒绝
fn cors_layer(config: &CorsConfig) -> AppResult<CorsLayer> {
    let mut cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    if config.allows_any_origin() {
        cors = cors.allow_origin(Any);
    } else {
        let origins = config
            .allowed_origins
            .iter()
            .map(|origin| {
                HeaderValue::from_str(origin)
                    .map_err(|_| RelayError::Config(format!("invalid allowed origin: {origin}")))
            })
            .collect::<AppResult<Vec<_>>>()?;
        cors = cors.allow_origin(AllowOrigin::list(origins));
    }

    if config.allow_credentials {
        cors = cors.allow_credentials(true);
    }

    Ok(cors)
}

/// A pre-flight carries both `Origin` and `Access-Control-Request-Method`.
fn is_plain_options(req: &Request) -> bool {
    let headers = req.headers();
    req.method() == Method::OPTIONS
        && !(headers.contains_key(header::ORIGIN)
            && headers.contains_key(header::ACCESS_CONTROL_REQUEST_METHOD))
}

/// Cross-cutting layers: tracing span, request log, CORS, panic capture.
///
/// `CorsLayer` answers every OPTIONS itself, so plain OPTIONS requests skip it
/// and reach routing (204 on defined paths, 404 elsewhere).
pub fn with_policy(router: Router, cors: CorsLayer) -> Router {
    let plain = router.layer(CatchPanicLayer::custom(handlers::fallback::panic_response));
    let guarded = plain.clone().layer(cors);

    let dispatch = tower::service_fn(move |req: Request| {
        let target = if is_plain_options(&req) {
            plain.clone()
        } else {
            guarded.clone()
        };
        target.oneshot(req)
    });

    // span 只记录 path，查询串里有检索词
    let trace = TraceLayer::new_for_http().make_span_with(|req: &Request| {
        tracing::debug_span!("request", method = %req.method(), path = req.uri().path())
    });

    Router::new().fallback_service(dispatch).layer(
        ServiceBuilder::new()
            .layer(trace)
            .layer(axum::middleware::from_fn(request_logging::log_requests)),
    )
}
