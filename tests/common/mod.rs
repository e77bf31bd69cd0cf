#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode},
};
use forgejo_buildkite_bridge::buildkite::{BuildRequest, BuildTrigger};
use forgejo_buildkite_bridge::config::BridgeConfig;
use forgejo_buildkite_bridge::error::{BridgeError, Result};
use forgejo_buildkite_bridge::{AppState, router};
use std::io::Write;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;
use tracing::subscriber::DefaultGuard;
use tracing_subscriber::fmt::MakeWriter;

pub const ORG: &str = "acme";
pub const TOKEN: &str = "bk-test-token";

/// Canonical Forgejo push payload used across tests.
pub const PUSH_PAYLOAD: &str = r#"{
    "ref": "refs/heads/main",
    "before": "0000000000000000000000000000000000000000",
    "after": "abc123def456",
    "repository": {"id": 7, "name": "my-repo", "full_name": "user/my-repo", "private": false},
    "head_commit": {
        "id": "abc123def456",
        "message": "Fix login redirect",
        "url": "https://forge.example.com/user/my-repo/commit/abc123def456",
        "author": {"name": "John Doe", "email": "john@example.com", "username": "john"}
    },
    "pusher": {"id": 3, "username": "john", "login": "john"}
}"#;

/// Build trigger double that records every call.
#[derive(Clone, Default)]
pub struct RecordingTrigger {
    calls: Arc<Mutex<Vec<(String, BuildRequest)>>>,
    fail_with: Option<(u16, String)>,
}

impl RecordingTrigger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call fails as if Buildkite answered with `status` and `body`.
    pub fn failing(status: u16, body: &str) -> Self {
        Self {
            calls: Arc::default(),
            fail_with: Some((status, body.to_string())),
        }
    }

    pub fn calls(&self) -> Vec<(String, BuildRequest)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl BuildTrigger for RecordingTrigger {
    async fn trigger(&self, pipeline: &str, request: &BuildRequest) -> Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push((pipeline.to_string(), request.clone()));

        match &self.fail_with {
            Some((status, body)) => Err(BridgeError::Downstream {
                status: *status,
                body: body.clone(),
            }),
            None => Ok(()),
        }
    }
}

pub fn test_config() -> BridgeConfig {
    BridgeConfig::new(ORG, TOKEN)
}

pub fn app_with_trigger(config: BridgeConfig, trigger: Arc<dyn BuildTrigger>) -> Router {
    router(Arc::new(AppState::with_trigger(config, trigger)))
}

/// Drive one request through the router and return status and body text.
pub async fn send(app: &Router, method: Method, uri: &str, body: &str) -> (StatusCode, String) {
    send_with_headers(app, method, uri, body, &[]).await
}

pub async fn send_with_headers(
    app: &Router,
    method: Method,
    uri: &str,
    body: &str,
    headers: &[(&str, &str)],
) -> (StatusCode, String) {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    let request = builder.body(Body::from(body.to_string())).unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

/// In-memory log sink shared with a thread-local fmt subscriber.
#[derive(Clone, Default)]
pub struct LogCapture(Arc<Mutex<Vec<u8>>>);

impl LogCapture {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogCapture {
    type Writer = LogCapture;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Capture everything logged on this thread until the guard is dropped.
/// Use with the default current-thread `#[tokio::test]` runtime.
pub fn capture_logs() -> (LogCapture, DefaultGuard) {
    let capture = LogCapture::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(capture.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::DEBUG)
        .finish();
    let guard = tracing::subscriber::set_default(subscriber);
    (capture, guard)
}
