//! The header set applied to every outgoing response.

use http::header::{HeaderMap, HeaderName, HeaderValue};
use indexmap::IndexMap;
use std::fmt;
use thiserror::Error;

/// Header names carried by the isolation profiles.
pub mod names {
    pub const CROSS_ORIGIN_OPENER_POLICY: &str = "cross-origin-opener-policy";
    pub const CROSS_ORIGIN_EMBEDDER_POLICY: &str = "cross-origin-embedder-policy";
    pub const STRICT_TRANSPORT_SECURITY: &str = "strict-transport-security";
    pub const X_CONTENT_TYPE_OPTIONS: &str = "x-content-type-options";
    pub const X_FRAME_OPTIONS: &str = "x-frame-options";
    pub const CONTENT_SECURITY_POLICY: &str = "content-security-policy";
}

/// Header values carried by the isolation profiles.
pub mod values {
    pub const SAME_ORIGIN: &str = "same-origin";
    pub const REQUIRE_CORP: &str = "require-corp";
    pub const HSTS: &str = "max-age=31536000; includeSubDomains";
    pub const NOSNIFF: &str = "nosniff";
    pub const DENY: &str = "DENY";
}

/// The two entries every response must carry, in order.
pub const MANDATORY: [(&str, &str); 2] = [
    (names::CROSS_ORIGIN_OPENER_POLICY, values::SAME_ORIGIN),
    (names::CROSS_ORIGIN_EMBEDDER_POLICY, values::REQUIRE_CORP),
];

/// Header set errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HeaderSetError {
    #[error("Invalid header name: {0}")]
    InvalidName(String),
    #[error("Invalid value for header {name}: {value}")]
    InvalidValue { name: String, value: String },
    #[error("Header {name} is mandatory and must be '{expected}'")]
    MandatoryConflict { name: String, expected: String },
    #[error("Header {0} is mandatory and cannot be removed")]
    MandatoryRemoval(String),
}

/// Ordered header name to value mapping applied to responses.
///
/// The mandatory isolation entries are always present and always first.
#[derive(Clone, PartialEq, Eq)]
pub struct HeaderSet {
    entries: IndexMap<HeaderName, HeaderValue>,
}

impl HeaderSet {
    /// Create a set holding only the mandatory isolation entries.
    pub fn isolation() -> Self {
        let mut entries = IndexMap::new();
        for (name, value) in MANDATORY {
            entries.insert(
                HeaderName::from_static(name),
                HeaderValue::from_static(value),
            );
        }
        Self { entries }
    }

    /// Add or replace a header.
    ///
    /// Mandatory names only accept their enforced value.
    pub fn insert(&mut self, name: &str, value: &str) -> Result<(), HeaderSetError> {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| HeaderSetError::InvalidName(name.to_string()))?;
        let header_value =
            HeaderValue::from_str(value).map_err(|_| HeaderSetError::InvalidValue {
                name: name.to_string(),
                value: value.to_string(),
            })?;

        if let Some(expected) = mandatory_value(header_name.as_str()) {
            if expected != value {
                return Err(HeaderSetError::MandatoryConflict {
                    name: header_name.as_str().to_string(),
                    expected: expected.to_string(),
                });
            }
        }

        self.entries.insert(header_name, header_value);
        Ok(())
    }

    /// Builder form of [`HeaderSet::insert`].
    pub fn with(mut self, name: &str, value: &str) -> Result<Self, HeaderSetError> {
        self.insert(name, value)?;
        Ok(self)
    }

    /// Remove a non-mandatory header.
    pub fn remove(&mut self, name: &str) -> Result<Option<String>, HeaderSetError> {
        let lower = name.to_ascii_lowercase();
        if mandatory_value(&lower).is_some() {
            return Err(HeaderSetError::MandatoryRemoval(lower));
        }
        Ok(parse_name(&lower)
            .and_then(|n| self.entries.shift_remove(&n))
            .and_then(|v| v.to_str().ok().map(str::to_string)))
    }

    /// Get a header value (case-insensitive).
    pub fn get(&self, name: &str) -> Option<&str> {
        parse_name(name)
            .and_then(|n| self.entries.get(&n))
            .and_then(|v| v.to_str().ok())
    }

    /// Check if a header exists.
    pub fn contains(&self, name: &str) -> bool {
        parse_name(name).is_some_and(|n| self.entries.contains_key(&n))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over entries in application order.
    pub fn iter(&self) -> impl Iterator<Item = (&HeaderName, &HeaderValue)> {
        self.entries.iter()
    }

    /// Header names in application order.
    pub fn names(&self) -> Vec<&str> {
        self.entries.keys().map(HeaderName::as_str).collect()
    }

    /// Check whether every entry of `other` is present here with the same value.
    pub fn is_superset_of(&self, other: &HeaderSet) -> bool {
        other
            .entries
            .iter()
            .all(|(name, value)| self.entries.get(name) == Some(value))
    }

    /// Attach every entry to a response header map.
    ///
    /// Headers not in the set are left untouched; entries in the set
    /// replace whatever value the response carried.
    pub fn apply(&self, headers: &mut HeaderMap) {
        for (name, value) in &self.entries {
            headers.insert(name.clone(), value.clone());
        }
    }
}

impl Default for HeaderSet {
    fn default() -> Self {
        Self::isolation()
    }
}

impl fmt::Debug for HeaderSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.entries.iter().map(|(k, v)| (k.as_str(), v)))
            .finish()
    }
}

impl fmt::Display for HeaderSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in &self.entries {
            writeln!(f, "{}: {}", name, value.to_str().unwrap_or("<binary>"))?;
        }
        Ok(())
    }
}

fn parse_name(name: &str) -> Option<HeaderName> {
    HeaderName::from_bytes(name.as_bytes()).ok()
}

fn mandatory_value(name: &str) -> Option<&'static str> {
    MANDATORY
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(name))
        .map(|(_, v)| *v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_isolation_set() {
        let set = HeaderSet::isolation();
        assert_eq!(set.len(), 2);
        assert_eq!(set.get("Cross-Origin-Opener-Policy"), Some("same-origin"));
        assert_eq!(set.get("cross-origin-embedder-policy"), Some("require-corp"));
        assert_eq!(
            set.names(),
            vec![
                names::CROSS_ORIGIN_OPENER_POLICY,
                names::CROSS_ORIGIN_EMBEDDER_POLICY
            ]
        );
    }

    #[test]
    fn test_insert_keeps_mandatory_first() {
        let set = HeaderSet::isolation()
            .with("X-Frame-Options", "DENY")
            .unwrap();
        assert_eq!(set.names()[0], names::CROSS_ORIGIN_OPENER_POLICY);
        assert_eq!(set.names()[1], names::CROSS_ORIGIN_EMBEDDER_POLICY);
        assert_eq!(set.names()[2], names::X_FRAME_OPTIONS);
    }

    #[test]
    fn test_mandatory_conflict_rejected() {
        let mut set = HeaderSet::isolation();
        let err = set
            .insert("Cross-Origin-Embedder-Policy", "credentialless")
            .unwrap_err();
        assert!(matches!(err, HeaderSetError::MandatoryConflict { .. }));

        // Re-asserting the enforced value is fine.
        set.insert("Cross-Origin-Opener-Policy", "same-origin").unwrap();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_mandatory_removal_rejected() {
        let mut set = HeaderSet::isolation().with("x-extra", "1").unwrap();
        assert!(set.remove("CROSS-ORIGIN-OPENER-POLICY").is_err());
        assert_eq!(set.remove("X-Extra").unwrap(), Some("1".to_string()));
        assert!(!set.contains("x-extra"));
    }

    #[test]
    fn test_invalid_header_rejected() {
        let mut set = HeaderSet::isolation();
        assert!(matches!(
            set.insert("bad header", "x"),
            Err(HeaderSetError::InvalidName(_))
        ));
        assert!(matches!(
            set.insert("x-ok", "line\nbreak"),
            Err(HeaderSetError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_apply_is_additive() {
        let set = HeaderSet::isolation();
        let mut headers = HeaderMap::new();
        headers.insert("content-type", HeaderValue::from_static("text/html"));
        headers.insert(
            "cross-origin-opener-policy",
            HeaderValue::from_static("unsafe-none"),
        );

        set.apply(&mut headers);

        assert_eq!(headers.get("content-type").unwrap(), "text/html");
        assert_eq!(headers.get("cross-origin-opener-policy").unwrap(), "same-origin");
        assert_eq!(headers.get("cross-origin-embedder-policy").unwrap(), "require-corp");
    }

    #[test]
    fn test_superset() {
        let base = HeaderSet::isolation();
        let strict = base.clone().with("x-content-type-options", "nosniff").unwrap();
        assert!(strict.is_superset_of(&base));
        assert!(!base.is_superset_of(&strict));
    }
}
