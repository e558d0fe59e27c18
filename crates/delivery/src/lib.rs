//! Cross-origin isolated asset delivery.
//!
//! This crate wires the delivery components together:
//! - Origin server for the asset tree
//! - Edge handler in front of an asset store
//! - Offline agent install check against a running deployment

pub mod check;
pub mod config;

pub use check::{run_check, CheckReport, HeaderReport};
pub use config::{ConfigError, DeliveryConfig, EdgeSettings, OfflineSettings, OriginSettings};

/// Delivery version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
