pub mod api;
pub mod buildkite;
pub mod config;
pub mod error;
pub mod logging;
pub mod utils;
pub mod webhook;

use axum::{
    Router,
    routing::{any, get},
};
use std::sync::Arc;

use crate::buildkite::{BuildTrigger, BuildkiteClient};
use crate::config::BridgeConfig;
use crate::error::Result;

pub struct AppState {
    pub config: BridgeConfig,
    pub trigger: Arc<dyn BuildTrigger>,
}

impl AppState {
    /// State backed by the real Buildkite API client.
    pub fn new(config: BridgeConfig) -> Result<Self> {
        let client = BuildkiteClient::new(&config)?;
        Ok(Self::with_trigger(config, Arc::new(client)))
    }

    pub fn with_trigger(config: BridgeConfig, trigger: Arc<dyn BuildTrigger>) -> Self {
        Self { config, trigger }
    }
}

pub type SharedState = Arc<AppState>;

/// All routes served by the bridge.
pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(api::root))
        .route("/health", get(api::health))
        .route("/webhook", any(api::handle_webhook))
        .route("/webhook/", any(api::handle_webhook))
        .route("/webhook/{*pipeline}", any(api::handle_webhook))
        .with_state(state)
}
