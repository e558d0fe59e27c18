//! Common utilities and types shared by the delivery components.

pub mod error;

pub use error::{DeliveryError, DeliveryResult};
