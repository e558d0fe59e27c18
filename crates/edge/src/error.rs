//! Edge error types

use thiserror::Error;

/// Edge error type
#[derive(Error, Debug)]
pub enum EdgeError {
    #[error("Invalid upstream URL '{url}': {reason}")]
    InvalidUpstream { url: String, reason: String },

    #[error("Upstream request to {url} failed: {reason}")]
    Upstream { url: String, reason: String },

    #[error("Failed to read request body: {0}")]
    Body(String),

    #[error("Server bind failed: {reason}")]
    BindFailed { reason: String },

    #[error("Internal error: {reason}")]
    Internal { reason: String },
}

