//! Origin delivery server.
//!
//! Serves the asset tree from disk with the isolation headers on every
//! response, plus the two well-known files the offline agent depends on.

pub mod error;
pub mod listing;
pub mod manifest_check;
pub mod middleware;
pub mod routes;
pub mod self_check;
pub mod server;

pub use error::OriginError;
pub use server::{BoundOrigin, OriginConfig, OriginServer, DEFAULT_ORIGIN_PORT};
