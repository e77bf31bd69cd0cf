use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// Custom error type for forgejo_buildkite_bridge operations
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("pipeline identifier required")]
    MissingPipeline,

    #[error("invalid pipeline identifier: {0}")]
    InvalidPipeline(String),

    #[error("cannot read body: {0}")]
    BodyRead(String),

    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Invalid signature")]
    InvalidSignature,

    #[error("buildkite API returned {status}: {body}")]
    Downstream { status: u16, body: String },

    #[error("request failed: {0}")]
    Transport(String),

    #[error("request timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("failed to encode build payload: {0}")]
    Encode(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl BridgeError {
    /// HTTP status returned to the forge for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            BridgeError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            BridgeError::MissingPipeline
            | BridgeError::InvalidPipeline(_)
            | BridgeError::BodyRead(_)
            | BridgeError::InvalidJson(_) => StatusCode::BAD_REQUEST,
            BridgeError::InvalidSignature => StatusCode::UNAUTHORIZED,
            BridgeError::Downstream { .. }
            | BridgeError::Transport(_)
            | BridgeError::Timeout(_)
            | BridgeError::Encode(_)
            | BridgeError::ConfigError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// True when the inbound request itself was at fault.
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }

    /// Plain-text body sent back to the caller.
    ///
    /// Parser details stay in the server log; downstream failures carry the
    /// classified error text so the forge's delivery log shows what happened.
    pub fn response_message(&self) -> String {
        match self {
            BridgeError::BodyRead(_) => "Bad request: cannot read body".to_string(),
            BridgeError::InvalidJson(_) => "Bad request: invalid JSON".to_string(),
            BridgeError::MissingPipeline | BridgeError::InvalidPipeline(_) => self.to_string(),
            BridgeError::MethodNotAllowed | BridgeError::InvalidSignature => self.to_string(),
            BridgeError::Downstream { .. }
            | BridgeError::Transport(_)
            | BridgeError::Timeout(_)
            | BridgeError::Encode(_) => format!("Failed to trigger build: {}", self),
            BridgeError::ConfigError(_) => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for BridgeError {
    fn into_response(self) -> Response {
        (self.status_code(), self.response_message()).into_response()
    }
}

/// Helper type for Results that use BridgeError
pub type Result<T> = std::result::Result<T, BridgeError>;
