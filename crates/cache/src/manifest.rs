//! The asset manifest: the URLs an offline install must capture.

use common::{DeliveryError, DeliveryResult};
use serde::{Deserialize, Serialize};
use url::Url;

/// Entries shipped with the application bundle.
pub const DEFAULT_ENTRIES: &[&str] = &[
    "/",
    "/index.html",
    "/style.css",
    "/manifest.json",
    "https://unpkg.com/@ffmpeg/ffmpeg@0.12.10/dist/umd/ffmpeg.js",
    "https://unpkg.com/@ffmpeg/util@0.12.1/dist/umd/index.js",
];

/// Ordered, de-duplicated list of asset URLs.
///
/// Entries are either root-relative paths (`/style.css`) resolved against
/// the agent's origin, or absolute URLs for third-party assets.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct AssetManifest {
    entries: Vec<String>,
}

impl AssetManifest {
    pub fn new<I, S>(entries: I) -> DeliveryResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut deduped: Vec<String> = Vec::new();
        for (position, entry) in entries.into_iter().enumerate() {
            let entry = entry.into().trim().to_string();
            if entry.is_empty() {
                return Err(DeliveryError::manifest(format!(
                    "empty entry at position {}",
                    position
                )));
            }
            if !entry.starts_with('/') && Url::parse(&entry).is_err() {
                return Err(DeliveryError::manifest(format!(
                    "'{}' is neither a root-relative path nor an absolute URL",
                    entry
                )));
            }
            if !deduped.contains(&entry) {
                deduped.push(entry);
            }
        }
        Ok(Self { entries: deduped })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    /// Root-relative entries, i.e. the ones the origin must be able to serve.
    pub fn local_paths(&self) -> impl Iterator<Item = &str> {
        self.iter().filter(|e| e.starts_with('/'))
    }

    /// Resolve every entry against the origin the agent runs on.
    pub fn resolve(&self, base: &Url) -> DeliveryResult<Vec<Url>> {
        self.entries
            .iter()
            .map(|entry| base.join(entry).map_err(DeliveryError::from))
            .collect()
    }
}

impl Default for AssetManifest {
    fn default() -> Self {
        Self {
            entries: DEFAULT_ENTRIES.iter().map(|e| e.to_string()).collect(),
        }
    }
}

impl TryFrom<Vec<String>> for AssetManifest {
    type Error = DeliveryError;

    fn try_from(value: Vec<String>) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<AssetManifest> for Vec<String> {
    fn from(manifest: AssetManifest) -> Self {
        manifest.entries
    }
}
