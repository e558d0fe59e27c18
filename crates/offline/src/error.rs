//! Install errors.

use common::DeliveryError;
use thiserror::Error;

/// Why an install attempt did not produce a ready agent.
#[derive(Error, Debug)]
pub enum InstallError {
    #[error("Install already in progress")]
    InProgress,

    #[error("Agent is already installed")]
    AlreadyInstalled,

    #[error("Manifest could not be resolved: {0}")]
    Manifest(#[from] DeliveryError),

    #[error("Failed to fetch {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("Fetching {url} returned status {status}")]
    Status { url: String, status: u16 },
}

impl InstallError {
    /// The manifest URL that broke the batch, if the failure was a fetch.
    pub fn failed_url(&self) -> Option<&str> {
        match self {
            InstallError::Fetch { url, .. } | InstallError::Status { url, .. } => Some(url),
            _ => None,
        }
    }
}
