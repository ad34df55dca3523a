pub mod openai;
pub mod pubmed;

pub use openai::OpenAIProvider;
pub use pubmed::PubmedProvider;

use std::time::{Duration, Instant};

use axum::body::Bytes;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::error::{RelayError, Result};
use crate::http_client::client_for_url_with_timeout;

/// Successful upstream payload, relayed as-is.
#[derive(Debug)]
pub struct UpstreamReply {
    pub status: StatusCode,
    pub content_type: Option<HeaderValue>,
    pub body: Bytes,
}

impl IntoResponse for UpstreamReply {
    fn into_response(self) -> Response {
        let content_type = self
            .content_type
            .unwrap_or_else(|| HeaderValue::from_static("application/json"));
        (self.status, [(CONTENT_TYPE, content_type)], self.body).into_response()
    }
}

#[derive(Debug, Error)]
pub enum UpstreamFailure {
    /// Upstream answered with a non-success status.
    #[error("upstream responded with status {status}")]
    Status { status: StatusCode, body: Bytes },

    /// No usable response: connect failure, timeout, or a broken body.
    #[error("upstream unavailable: {0}")]
    Unavailable(String),

    /// Fault raised before the call was dispatched.
    #[error("local fault before dispatch: {0}")]
    Local(String),
}

impl UpstreamFailure {
    /// Shared outcome mapping; `message` is the route-specific error text.
    pub fn into_relay_error(self, message: &'static str) -> RelayError {
        match self {
            UpstreamFailure::Status { status, body } => RelayError::Upstream {
                status,
                message,
                details: error_details(&body),
            },
            UpstreamFailure::Unavailable(_) => RelayError::UpstreamUnavailable,
            UpstreamFailure::Local(reason) => RelayError::Internal(reason),
        }
    }
}

/// Upstream error body as JSON when it parses, otherwise as a JSON string.
pub fn error_details(body: &[u8]) -> Value {
    if body.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(body)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(body).into_owned()))
}

/// URL without its query string; the PubMed key travels there.
fn redacted(url: &reqwest::Url) -> String {
    let mut url = url.clone();
    url.set_query(None);
    url.to_string()
}

/// One fixed upstream: base URL plus a client bounded by the upstream's timeout.
#[derive(Debug, Clone)]
pub struct Upstream {
    name: &'static str,
    base_url: String,
    http: reqwest::Client,
}

impl Upstream {
    pub fn new(name: &'static str, base_url: &str, timeout: Duration) -> Result<Self> {
        let http = client_for_url_with_timeout(base_url, timeout)?;
        Ok(Self {
            name,
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Single attempt, no retry.
    pub async fn execute(
        &self,
        builder: reqwest::RequestBuilder,
    ) -> std::result::Result<UpstreamReply, UpstreamFailure> {
        let (client, request) = builder.build_split();
        let request = request.map_err(|e| {
            let e = e.without_url();
            error!(upstream = self.name, error = %e, "failed to build upstream request");
            UpstreamFailure::Local(e.to_string())
        })?;

        let target = redacted(request.url());
        let started = Instant::now();

        let response = match client.execute(request).await {
            Ok(resp) => resp,
            Err(e) => {
                let timed_out = e.is_timeout();
                let is_builder = e.is_builder();
                let e = e.without_url();
                error!(
                    upstream = self.name,
                    url = %target,
                    timed_out,
                    error = %e,
                    "upstream request failed"
                );
                return Err(if is_builder {
                    UpstreamFailure::Local(e.to_string())
                } else {
                    UpstreamFailure::Unavailable(e.to_string())
                });
            }
        };

        let status = response.status();
        let content_type = response.headers().get(CONTENT_TYPE).cloned();
        let body = response.bytes().await.map_err(|e| {
            let e = e.without_url();
            error!(upstream = self.name, url = %target, error = %e, "failed to read upstream body");
            UpstreamFailure::Unavailable(e.to_string())
        })?;
        let duration_ms = started.elapsed().as_millis();

        if status.is_success() {
            debug!(upstream = self.name, url = %target, status = status.as_u16(), duration_ms, "upstream ok");
            Ok(UpstreamReply {
                status,
                content_type,
                body,
            })
        } else {
            warn!(
                upstream = self.name,
                url = %target,
                status = status.as_u16(),
                duration_ms,
                "upstream returned error status"
            );
            Err(UpstreamFailure::Status { status, body })
        }
    }
}
