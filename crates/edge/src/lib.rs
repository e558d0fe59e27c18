//! Edge delivery handler.
//!
//! Runs in front of an asset store and stamps the enforced header set onto
//! every response it passes back, error responses included.

pub mod error;
pub mod handler;
pub mod store;

pub use error::EdgeError;
pub use handler::{router, serve, EdgeHandler};
pub use store::{AssetStore, DirectoryStore, UpstreamStore};

/// Request and response body type used throughout the edge.
pub type Body = axum::body::Body;
