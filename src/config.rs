//! Bridge configuration, read once at startup

use std::fmt;
use std::time::Duration;

use crate::error::{BridgeError, Result};

pub const DEFAULT_PORT: &str = "8080";
pub const DEFAULT_API_URL: &str = "https://api.buildkite.com";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
/// 256 KiB; Forgejo push payloads for normal pushes stay well below this.
pub const DEFAULT_MAX_BODY_BYTES: usize = 256 * 1024;

/// Immutable process-wide configuration.
#[derive(Clone)]
pub struct BridgeConfig {
    pub org_slug: String,
    pub api_token: String,
    pub listen_port: String,
    pub verbose: bool,
    pub api_base_url: String,
    pub request_timeout: Duration,
    pub max_body_bytes: usize,
    pub webhook_secret: Option<String>,
}

impl BridgeConfig {
    /// Minimal configuration with defaults for everything except org and token.
    pub fn new(org_slug: impl Into<String>, api_token: impl Into<String>) -> Self {
        Self {
            org_slug: org_slug.into(),
            api_token: api_token.into(),
            listen_port: DEFAULT_PORT.to_string(),
            verbose: false,
            api_base_url: DEFAULT_API_URL.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            webhook_secret: None,
        }
    }

    /// Load configuration from the process environment.
    ///
    /// Call `dotenv::dotenv()` first if a local `.env` file should be honoured.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    /// Empty values are treated the same as unset ones.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        let (org_slug, api_token) = match (get("BUILDKITE_ORG"), get("BUILDKITE_TOKEN")) {
            (Some(org), Some(token)) => (org, token),
            _ => {
                return Err(BridgeError::ConfigError(
                    "BUILDKITE_ORG and BUILDKITE_TOKEN environment variables must be set \
                     (token needs the write_builds scope)"
                        .to_string(),
                ));
            }
        };

        let mut config = Self::new(org_slug, api_token);

        if let Some(port) = get("WEBHOOK_PORT") {
            port.parse::<u16>().map_err(|e| {
                BridgeError::ConfigError(format!("Invalid WEBHOOK_PORT '{}': {}", port, e))
            })?;
            config.listen_port = port;
        }
        config.verbose = get("LOG_VERBOSE").as_deref() == Some("true");
        if let Some(url) = get("BUILDKITE_API_URL") {
            config.api_base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(secs) = get("BUILDKITE_TIMEOUT_SECS") {
            let secs = secs.parse::<u64>().map_err(|e| {
                BridgeError::ConfigError(format!("Invalid BUILDKITE_TIMEOUT_SECS '{}': {}", secs, e))
            })?;
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(bytes) = get("MAX_BODY_BYTES") {
            config.max_body_bytes = bytes.parse::<usize>().map_err(|e| {
                BridgeError::ConfigError(format!("Invalid MAX_BODY_BYTES '{}': {}", bytes, e))
            })?;
        }
        config.webhook_secret = get("WEBHOOK_SECRET");

        Ok(config)
    }

    /// Address the HTTP listener binds to.
    pub fn bind_address(&self) -> String {
        format!("0.0.0.0:{}", self.listen_port)
    }
}

impl fmt::Debug for BridgeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BridgeConfig")
            .field("org_slug", &self.org_slug)
            .field("api_token", &"<redacted>")
            .field("listen_port", &self.listen_port)
            .field("verbose", &self.verbose)
            .field("api_base_url", &self.api_base_url)
            .field("request_timeout", &self.request_timeout)
            .field("max_body_bytes", &self.max_body_bytes)
            .field("webhook_secret", &self.webhook_secret.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}
