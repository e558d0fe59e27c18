//! Checks that observed response headers carry the enforced set.

use crate::headers::HeaderSet;
use http::header::HeaderMap;
use std::fmt;
use thiserror::Error;

/// A header that is missing or carries the wrong value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HeaderMismatch {
    pub name: String,
    pub expected: String,
    /// `None` when the header is absent.
    pub actual: Option<String>,
}

impl fmt::Display for HeaderMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.actual {
            Some(actual) => write!(
                f,
                "{} is '{}', expected '{}'",
                self.name, actual, self.expected
            ),
            None => write!(f, "{} is missing, expected '{}'", self.name, self.expected),
        }
    }
}

/// The response would not place the page in a cross-origin isolated context.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("response is not cross-origin isolated: {}", format_mismatches(.mismatches))]
pub struct IsolationViolation {
    pub mismatches: Vec<HeaderMismatch>,
}

fn format_mismatches(mismatches: &[HeaderMismatch]) -> String {
    mismatches
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Compare observed headers against every entry of `set`.
///
/// Values must match byte-for-byte; names are compared case-insensitively.
pub fn verify_header_set(set: &HeaderSet, headers: &HeaderMap) -> Vec<HeaderMismatch> {
    set.iter()
        .filter_map(|(name, expected)| {
            let actual = headers.get(name);
            if actual == Some(expected) {
                return None;
            }
            Some(HeaderMismatch {
                name: name.as_str().to_string(),
                expected: expected.to_str().unwrap_or_default().to_string(),
                actual: actual.map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned()),
            })
        })
        .collect()
}

/// Check the two mandatory isolation headers.
pub fn verify_isolation(headers: &HeaderMap) -> Result<(), IsolationViolation> {
    let mismatches = verify_header_set(&HeaderSet::isolation(), headers);
    if mismatches.is_empty() {
        Ok(())
    } else {
        Err(IsolationViolation { mismatches })
    }
}
