//! Status page and health endpoint

use axum::{Json, extract::State as AxumState, response::Html};
use serde::Serialize;

use crate::SharedState;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub org: String,
}

/// GET /health - liveness check
pub async fn health(AxumState(state): AxumState<SharedState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: VERSION,
        org: state.config.org_slug.clone(),
    })
}

/// GET / - human readable status and setup instructions
pub async fn root(AxumState(state): AxumState<SharedState>) -> Html<String> {
    Html(render_status_page(
        &state.config.org_slug,
        &state.config.listen_port,
    ))
}

pub fn render_status_page(org: &str, port: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Forgejo-Buildkite Webhook Bridge</title>
    <style>
        body {{ font-family: system-ui; max-width: 800px; margin: 50px auto; padding: 20px; }}
        code {{ background: #f4f4f4; padding: 2px 6px; border-radius: 3px; }}
        h1 {{ color: #333; }}
        .status {{ color: #28a745; }}
    </style>
</head>
<body>
    <h1>Forgejo-Buildkite Webhook Bridge</h1>
    <p class="status">Service is running (v{version})</p>
    <h2>Configuration</h2>
    <ul>
        <li><strong>Buildkite Org:</strong> {org}</li>
        <li><strong>Webhook URL:</strong> <code>http://your-host:{port}/webhook/&lt;pipeline-slug&gt;</code></li>
    </ul>
    <h2>Setup Instructions</h2>
    <ol>
        <li>Open your Forgejo repository settings</li>
        <li>Go to Webhooks and add a Forgejo webhook</li>
        <li>Set the target URL to <code>http://your-host:{port}/webhook/&lt;pipeline-slug&gt;</code></li>
        <li>Set the content type to <code>application/json</code></li>
        <li>Trigger on <strong>Push events</strong></li>
    </ol>
    <h2>Endpoints</h2>
    <ul>
        <li><code>/</code> - This page</li>
        <li><code>/health</code> - Health check endpoint</li>
        <li><code>/webhook/&lt;pipeline-slug&gt;</code> - Webhook receiver</li>
    </ul>
</body>
</html>"#,
        version = VERSION,
        org = escape_html(org),
        port = escape_html(port),
    )
}

fn escape_html(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
