//! Buildkite build creation

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, header};
use serde::Serialize;
use tracing::{info, warn};

use crate::config::BridgeConfig;
use crate::error::{BridgeError, Result};
use crate::webhook::{InboundWebhook, short_commit};

pub const ENV_PUSHER: &str = "FORGEJO_PUSHER";
pub const ENV_REPO: &str = "FORGEJO_REPO";
pub const ENV_REPO_NAME: &str = "FORGEJO_REPO_NAME";

/// Body of `POST /v2/organizations/{org}/pipelines/{pipeline}/builds`
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BuildRequest {
    pub commit: String,
    pub branch: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<BuildAuthor>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BuildAuthor {
    pub name: String,
    pub email: String,
}

impl BuildRequest {
    /// Map a push event onto a build request.
    /// `branch` is the already-normalized branch name.
    pub fn from_webhook(webhook: &InboundWebhook, branch: &str) -> Self {
        let commit_author = &webhook.head_commit.author;
        let author = if commit_author.name.is_empty() && commit_author.email.is_empty() {
            None
        } else {
            Some(BuildAuthor {
                name: commit_author.name.clone(),
                email: commit_author.email.clone(),
            })
        };

        let env = BTreeMap::from([
            (ENV_PUSHER.to_string(), webhook.pusher.username.clone()),
            (ENV_REPO.to_string(), webhook.repository.full_name.clone()),
            (ENV_REPO_NAME.to_string(), webhook.repository.name.clone()),
        ]);

        Self {
            commit: webhook.head_commit.id.clone(),
            branch: branch.to_string(),
            message: webhook.head_commit.message.clone(),
            author,
            env,
        }
    }
}

/// The call-and-map stage of the webhook pipeline.
///
/// One attempt per invocation; implementations must not retry.
#[async_trait]
pub trait BuildTrigger: Send + Sync {
    async fn trigger(&self, pipeline: &str, request: &BuildRequest) -> Result<()>;
}

/// Buildkite REST API client.
pub struct BuildkiteClient {
    client: Client,
    base_url: String,
    org: String,
    token: String,
    timeout: Duration,
    verbose: bool,
}

impl BuildkiteClient {
    pub fn new(config: &BridgeConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!("forgejo-buildkite-bridge/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| BridgeError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            org: config.org_slug.clone(),
            token: config.api_token.clone(),
            timeout: config.request_timeout,
            verbose: config.verbose,
        })
    }

    pub fn builds_url(&self, pipeline: &str) -> String {
        format!(
            "{}/v2/organizations/{}/pipelines/{}/builds",
            self.base_url, self.org, pipeline
        )
    }

    fn classify(&self, err: reqwest::Error) -> BridgeError {
        if err.is_timeout() {
            BridgeError::Timeout(self.timeout)
        } else {
            BridgeError::Transport(err.to_string())
        }
    }
}

#[async_trait]
impl BuildTrigger for BuildkiteClient {
    async fn trigger(&self, pipeline: &str, request: &BuildRequest) -> Result<()> {
        let url = self.builds_url(pipeline);
        let payload =
            serde_json::to_vec(request).map_err(|e| BridgeError::Encode(e.to_string()))?;

        if self.verbose {
            info!("org='{}', pipeline='{}'", self.org, pipeline);
            info!("URL='{}'", url);
            info!("Buildkite payload: {}", String::from_utf8_lossy(&payload));
        }

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .header(header::CONTENT_TYPE, "application/json")
            .body(payload)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        // A body that fails to read mid-stream is reported as empty.
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                warn!(
                    "Failed to read Buildkite response body for {}/{} ({}): {}",
                    self.org,
                    pipeline,
                    status.as_u16(),
                    e
                );
                String::new()
            }
        };

        if self.verbose {
            info!("Buildkite response ({}): {}", status.as_u16(), body);
        }

        if status != StatusCode::OK && status != StatusCode::CREATED {
            return Err(BridgeError::Downstream {
                status: status.as_u16(),
                body,
            });
        }

        info!(
            "Build triggered: {}/{} (branch: {}, commit: {})",
            self.org,
            pipeline,
            request.branch,
            short_commit(&request.commit)
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_webhook() -> InboundWebhook {
        InboundWebhook::decode(
            br#"{
                "ref": "refs/heads/main",
                "repository": {"name": "my-repo", "full_name": "user/my-repo"},
                "head_commit": {
                    "id": "abc123def456",
                    "message": "Fix bug",
                    "author": {"name": "John Doe", "email": "john@example.com", "username": "john"}
                },
                "pusher": {"username": "john"}
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn maps_webhook_fields() {
        let webhook = sample_webhook();
        let request = BuildRequest::from_webhook(&webhook, webhook.branch());

        assert_eq!(request.commit, "abc123def456");
        assert_eq!(request.branch, "main");
        assert_eq!(request.message, "Fix bug");
        assert_eq!(
            request.author,
            Some(BuildAuthor {
                name: "John Doe".to_string(),
                email: "john@example.com".to_string(),
            })
        );
        assert_eq!(request.env.len(), 3);
        assert_eq!(request.env[ENV_PUSHER], "john");
        assert_eq!(request.env[ENV_REPO], "user/my-repo");
        assert_eq!(request.env[ENV_REPO_NAME], "my-repo");
    }

    #[test]
    fn identical_webhooks_serialize_identically() {
        let webhook = sample_webhook();
        let first = serde_json::to_vec(&BuildRequest::from_webhook(&webhook, "main")).unwrap();
        let second = serde_json::to_vec(&BuildRequest::from_webhook(&webhook, "main")).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn author_omitted_when_payload_has_none() {
        let webhook = InboundWebhook::decode(br#"{"ref": "refs/heads/main"}"#).unwrap();
        let request = BuildRequest::from_webhook(&webhook, "main");
        assert!(request.author.is_none());

        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("author").is_none());
        assert_eq!(json["env"][ENV_PUSHER], "");
    }

    #[test]
    fn builds_url_uses_org_and_pipeline() {
        let mut config = BridgeConfig::new("acme", "t");
        config.api_base_url = "http://localhost:9999/".to_string();
        let client = BuildkiteClient::new(&config).unwrap();
        assert_eq!(
            client.builds_url("my-pipeline"),
            "http://localhost:9999/v2/organizations/acme/pipelines/my-pipeline/builds"
        );
    }
}
