//! Versioned cache names.

use common::{DeliveryError, DeliveryResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A cache identifier of the form `<prefix>-v<version>`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CacheName {
    prefix: String,
    version: u32,
}

impl CacheName {
    pub fn new(prefix: impl Into<String>, version: u32) -> DeliveryResult<Self> {
        let prefix = prefix.into();
        if prefix.is_empty() {
            return Err(DeliveryError::cache_name("prefix must not be empty"));
        }
        if prefix.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(DeliveryError::cache_name(format!(
                "prefix '{}' contains whitespace",
                prefix
            )));
        }
        Ok(Self { prefix, version })
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    /// The name for the next version of this cache.
    pub fn next(&self) -> Self {
        Self {
            prefix: self.prefix.clone(),
            version: self.version + 1,
        }
    }

    /// Same prefix, different version.
    pub fn is_sibling(&self, other: &CacheName) -> bool {
        self.prefix == other.prefix && self.version != other.version
    }
}

impl Default for CacheName {
    fn default() -> Self {
        Self {
            prefix: "video-editor".to_string(),
            version: 1,
        }
    }
}

impl fmt::Display for CacheName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-v{}", self.prefix, self.version)
    }
}

impl FromStr for CacheName {
    type Err = DeliveryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (prefix, version) = s
            .rsplit_once("-v")
            .ok_or_else(|| DeliveryError::cache_name(format!("'{}' has no -v<version> suffix", s)))?;
        let version = version
            .parse::<u32>()
            .map_err(|_| DeliveryError::cache_name(format!("'{}' has a non-numeric version", s)))?;
        Self::new(prefix, version)
    }
}

impl TryFrom<String> for CacheName {
    type Error = DeliveryError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CacheName> for String {
    fn from(name: CacheName) -> Self {
        name.to_string()
    }
}
