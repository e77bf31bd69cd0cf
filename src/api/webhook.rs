//! Webhook handler for Forgejo push events

use axum::{
    Json,
    body::{Body, Bytes},
    extract::State as AxumState,
    http::{HeaderMap, Method, Uri},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::{Instrument, error, info, info_span, warn};

use crate::SharedState;
use crate::buildkite::BuildRequest;
use crate::error::{BridgeError, Result};
use crate::utils::{delivery_id, pipeline_from_path, signature_header, verify_signature};
use crate::webhook::InboundWebhook;

/// 200 response body after Buildkite accepted the build
#[derive(Debug, Serialize)]
pub struct BuildTriggered {
    pub status: &'static str,
    pub message: &'static str,
    pub pipeline: String,
    pub branch: String,
    pub commit: String,
}

/// Result of the decode-and-validate stage: everything the call stage needs.
#[derive(Debug)]
pub struct PreparedBuild {
    pub pipeline: String,
    pub short_commit: String,
    pub request: BuildRequest,
}

/// Handles `/webhook/<pipeline>` for any method.
pub async fn handle_webhook(
    AxumState(state): AxumState<SharedState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Body,
) -> Response {
    let delivery = delivery_id(&headers);
    let span = info_span!("webhook", %delivery, path = %uri.path());

    async move {
        let outcome = match prepare_build(&state, &method, uri.path(), &headers, body).await {
            Ok(prepared) => trigger_build(&state, prepared).await,
            Err(e) => Err(e),
        };

        match outcome {
            Ok(triggered) => Json(triggered).into_response(),
            Err(e) => {
                if e.is_client_error() {
                    warn!("Rejected webhook: {}", e);
                } else {
                    error!(org = %state.config.org_slug, "Failed to trigger build: {}", e);
                }
                e.into_response()
            }
        }
    }
    .instrument(span)
    .await
}

/// Decode-and-validate stage. No outbound call happens here.
pub async fn prepare_build(
    state: &SharedState,
    method: &Method,
    path: &str,
    headers: &HeaderMap,
    body: Body,
) -> Result<PreparedBuild> {
    if *method != Method::POST {
        return Err(BridgeError::MethodNotAllowed);
    }

    let pipeline = pipeline_from_path(path)?.to_string();
    let body = read_body(body, state.config.max_body_bytes).await?;

    if state.config.verbose {
        info!("Received payload: {}", String::from_utf8_lossy(&body));
    }

    if let Some(secret) = state.config.webhook_secret.as_deref() {
        let valid = signature_header(headers)
            .map(|sig| verify_signature(secret, &body, sig))
            .unwrap_or(false);
        if !valid {
            return Err(BridgeError::InvalidSignature);
        }
    }

    let webhook = InboundWebhook::decode(&body)?;
    let branch = webhook.branch();
    let short_commit = webhook.short_commit().to_string();

    info!(
        "Webhook: repo={}, branch={}, commit={}, author={}",
        webhook.repository.full_name, branch, short_commit, webhook.pusher.username
    );

    Ok(PreparedBuild {
        request: BuildRequest::from_webhook(&webhook, branch),
        pipeline,
        short_commit,
    })
}

/// Call-and-map stage: exactly one attempt against the configured trigger.
pub async fn trigger_build(state: &SharedState, prepared: PreparedBuild) -> Result<BuildTriggered> {
    state
        .trigger
        .trigger(&prepared.pipeline, &prepared.request)
        .await?;

    Ok(BuildTriggered {
        status: "success",
        message: "Build triggered successfully",
        pipeline: prepared.pipeline,
        branch: prepared.request.branch,
        commit: prepared.short_commit,
    })
}

async fn read_body(body: Body, limit: usize) -> Result<Bytes> {
    axum::body::to_bytes(body, limit)
        .await
        .map_err(|e| BridgeError::BodyRead(e.to_string()))
}
