//! Shared helpers: a stub upstream that plays both the chat provider and
//! E-utilities, and a driver for the relay router.
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Body;
use axum::extract::{RawQuery, State};
use axum::http::{HeaderMap, Request, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use secrecy::Secret;
use serde_json::{Value, json};
use tower::ServiceExt;

use pubmed_relay::config::Settings;
use pubmed_relay::server::create_app;

pub const OPENAI_KEY: &str = "sk-test-key";
pub const PUBMED_KEY: &str = "ncbi-test-key";
pub const ABSTRACT_TEXT: &str = "1. Example abstract text.";

#[derive(Clone, Copy, Debug)]
pub enum Mode {
    Ok,
    Fail,
    Slow,
}

#[derive(Debug)]
pub struct Stub {
    mode: Mode,
    calls: AtomicUsize,
    last_query: Mutex<Option<String>>,
    last_auth: Mutex<Option<String>>,
    last_body: Mutex<Option<Value>>,
}

impl Stub {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_query(&self) -> Option<String> {
        self.last_query.lock().unwrap().clone()
    }

    pub fn last_auth(&self) -> Option<String> {
        self.last_auth.lock().unwrap().clone()
    }

    pub fn last_body(&self) -> Option<Value> {
        self.last_body.lock().unwrap().clone()
    }

    /// Value of `name` in the last captured query string, still form-encoded.
    pub fn query_param(&self, name: &str) -> Option<String> {
        let query = self.last_query()?;
        let pairs: Vec<(String, String)> = serde_urlencoded::from_str(&query).ok()?;
        pairs.into_iter().find_map(|(k, v)| (k == name).then_some(v))
    }

    async fn record(&self, query: Option<String>, headers: &HeaderMap) -> Option<Response> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_query.lock().unwrap() = query;
        *self.last_auth.lock().unwrap() = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        match self.mode {
            Mode::Ok => None,
            Mode::Fail => Some(
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({"error": "upstream exploded"})),
                )
                    .into_response(),
            ),
            Mode::Slow => {
                tokio::time::sleep(Duration::from_secs(2)).await;
                None
            }
        }
    }
}

async fn chat(
    State(stub): State<Arc<Stub>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    *stub.last_body.lock().unwrap() = Some(body);
    if let Some(resp) = stub.record(None, &headers).await {
        return resp;
    }
    Json(json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "choices": [{"index": 0, "message": {"role": "assistant", "content": "ok"}}]
    }))
    .into_response()
}

async fn esearch(State(stub): State<Arc<Stub>>, headers: HeaderMap, RawQuery(q): RawQuery) -> Response {
    if let Some(resp) = stub.record(q, &headers).await {
        return resp;
    }
    Json(json!({"esearchresult": {"count": "2", "idlist": ["31452104", "31452105"]}})).into_response()
}

async fn esummary(State(stub): State<Arc<Stub>>, headers: HeaderMap, RawQuery(q): RawQuery) -> Response {
    if let Some(resp) = stub.record(q, &headers).await {
        return resp;
    }
    Json(json!({"result": {"uids": ["31452104"]}})).into_response()
}

async fn efetch(State(stub): State<Arc<Stub>>, headers: HeaderMap, RawQuery(q): RawQuery) -> Response {
    if let Some(resp) = stub.record(q, &headers).await {
        return resp;
    }
    ([(header::CONTENT_TYPE, "text/plain")], ABSTRACT_TEXT).into_response()
}

/// Serve a stub upstream on an ephemeral port; returns its base URL.
pub async fn spawn_stub(mode: Mode) -> (String, Arc<Stub>) {
    let stub = Arc::new(Stub {
        mode,
        calls: AtomicUsize::new(0),
        last_query: Mutex::new(None),
        last_auth: Mutex::new(None),
        last_body: Mutex::new(None),
    });

    let app = Router::new()
        .route("/v1/chat/completions", post(chat))
        .route("/esearch.fcgi", get(esearch))
        .route("/esummary.fcgi", get(esummary))
        .route("/efetch.fcgi", get(efetch))
        .with_state(stub.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}"), stub)
}

/// Base URL of a port that refuses connections.
pub async fn unreachable_base() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

pub fn settings_for(base_url: &str) -> Settings {
    let mut settings = Settings::default();
    settings.server.environment = "test".into();
    settings.openai.base_url = base_url.to_string();
    settings.openai.api_key = Some(Secret::new(OPENAI_KEY.to_string()));
    settings.openai.timeout_ms = 500;
    settings.pubmed.base_url = base_url.to_string();
    settings.pubmed.api_key = Some(Secret::new(PUBMED_KEY.to_string()));
    settings.pubmed.timeout_ms = 500;
    settings
}

pub async fn relay_for(mode: Mode) -> (Router, Arc<Stub>) {
    let (base, stub) = spawn_stub(mode).await;
    let app = create_app(settings_for(&base)).await.unwrap();
    (app, stub)
}

pub struct Reply {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub text: String,
}

impl Reply {
    pub fn json(&self) -> Value {
        serde_json::from_str(&self.text).unwrap()
    }
}

pub async fn send(app: &Router, request: Request<Body>) -> Reply {
    let resp = app.clone().oneshot(request).await.unwrap();
    let status = resp.status();
    let headers = resp.headers().clone();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    Reply {
        status,
        headers,
        text: String::from_utf8(bytes.to_vec()).unwrap(),
    }
}

pub async fn get_path(app: &Router, uri: &str) -> Reply {
    send(app, Request::builder().uri(uri).body(Body::empty()).unwrap()).await
}

pub async fn post_json(app: &Router, uri: &str, body: &str) -> Reply {
    send(
        app,
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await
}
