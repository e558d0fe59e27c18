//! Response header policy for cross-origin isolated delivery.
//!
//! This crate owns the single source of truth for:
//! - The isolation header set (COOP / COEP)
//! - The stricter edge profile (HSTS, nosniff, frame denial, CSP)
//! - Content Security Policy construction and source checks
//! - Verification of headers observed on live responses

pub mod csp;
pub mod headers;
pub mod profile;
pub mod verify;

pub use csp::{ContentSecurityPolicy, CspCheck, CspDirective, CspSource, CspViolation};
pub use headers::{HeaderSet, HeaderSetError};
pub use profile::{CspAllowList, IsolationProfile};
pub use verify::{verify_header_set, verify_isolation, HeaderMismatch, IsolationViolation};
