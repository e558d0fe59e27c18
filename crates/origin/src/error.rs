//! Origin server error types

use delivery_security::IsolationViolation;
use std::path::PathBuf;
use thiserror::Error;

/// Origin server error type
#[derive(Error, Debug)]
pub enum OriginError {
    #[error("Asset root {} is not a directory", .path.display())]
    RootMissing { path: PathBuf },

    #[error("Server bind failed on {addr}: {reason}")]
    BindFailed { addr: String, reason: String },

    #[error("Startup self-check could not reach {url}: {reason}")]
    SelfCheckUnreachable { url: String, reason: String },

    #[error("Startup self-check failed: {0}")]
    SelfCheck(#[from] IsolationViolation),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal server error: {reason}")]
    Internal { reason: String },
}

