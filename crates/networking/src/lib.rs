//! Networking layer shared by the delivery components.
//!
//! This crate handles:
//! - The request/response model cached by the offline agent
//! - The `Fetch` collaborator seam (live network vs. test doubles)
//! - A reqwest-backed HTTP client implementing `Fetch`

pub mod client;
pub mod fetch;
pub mod request;
pub mod response;

pub use client::{ClientConfig, ClientError, HttpClient, HttpClientBuilder};
pub use fetch::Fetch;
pub use request::Request;
pub use response::Response;
