//! Common error types.

use thiserror::Error;

/// Validation errors for the data shared by the origin, edge and agent.
#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("Invalid manifest: {0}")]
    InvalidManifest(String),

    #[error("Invalid cache name: {0}")]
    InvalidCacheName(String),
}

pub type DeliveryResult<T> = Result<T, DeliveryError>;

impl DeliveryError {
    pub fn manifest(msg: impl Into<String>) -> Self {
        Self::InvalidManifest(msg.into())
    }

    pub fn cache_name(msg: impl Into<String>) -> Self {
        Self::InvalidCacheName(msg.into())
    }
}
