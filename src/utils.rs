use axum::http::HeaderMap;
use tracing::error;
use uuid::Uuid;

use crate::error::{BridgeError, Result};

// For signature verification
use hex::decode as hex_decode;
use hmac::{Hmac, Mac};
use sha2::Sha256;
type HmacSha256 = Hmac<Sha256>;

pub const WEBHOOK_ROUTE_PREFIX: &str = "/webhook";

const SIGNATURE_HEADERS: [&str; 2] = ["X-Forgejo-Signature", "X-Gitea-Signature"];
const DELIVERY_HEADERS: [&str; 2] = ["X-Forgejo-Delivery", "X-Gitea-Delivery"];

/// Extract the pipeline identifier from a webhook request path.
///
/// `/webhook/my-app` and `/webhook/my-app/` both yield `my-app`. Only Buildkite
/// slug characters are accepted, so the identifier can never change the shape of
/// the outbound URL (no `/`, dot segments or percent escapes).
pub fn pipeline_from_path(path: &str) -> Result<&str> {
    let rest = path
        .strip_prefix(WEBHOOK_ROUTE_PREFIX)
        .map(|r| r.strip_prefix('/').unwrap_or(r))
        .unwrap_or(path);
    let pipeline = rest.strip_suffix('/').unwrap_or(rest);

    if pipeline.is_empty() {
        return Err(BridgeError::MissingPipeline);
    }
    if !pipeline.chars().all(is_slug_char) {
        return Err(BridgeError::InvalidPipeline(pipeline.to_string()));
    }
    Ok(pipeline)
}

fn is_slug_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

/// Signature header sent by Forgejo (or Gitea), if any.
pub fn signature_header(headers: &HeaderMap) -> Option<&str> {
    SIGNATURE_HEADERS
        .iter()
        .find_map(|name| headers.get(*name))
        .and_then(|v| v.to_str().ok())
}

/// Delivery id from the forge headers, or a fresh UUIDv7 when absent.
pub fn delivery_id(headers: &HeaderMap) -> String {
    DELIVERY_HEADERS
        .iter()
        .find_map(|name| headers.get(*name))
        .and_then(|v| v.to_str().ok())
        .map(String::from)
        .unwrap_or_else(|| Uuid::now_v7().to_string())
}

/// Verify a Forgejo webhook signature: hex HMAC-SHA256 of the raw body.
/// A GitHub-style `sha256=` prefix is accepted as well.
pub fn verify_signature(secret: &str, payload: &[u8], signature: &str) -> bool {
    let signature = signature.strip_prefix("sha256=").unwrap_or(signature);

    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return false,
    };
    mac.update(payload);

    match hex_decode(signature) {
        // verify_slice compares in constant time
        Ok(signature_bytes) => mac.verify_slice(&signature_bytes).is_ok(),
        Err(_) => {
            error!("Signature header is not valid hex");
            false
        }
    }
}
