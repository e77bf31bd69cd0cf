//! API module for all HTTP handlers

pub mod status;
pub mod webhook;

// Re-export handlers
pub use status::{health, root};
pub use webhook::handle_webhook;
