//! Agent configuration.

use cache::{AssetManifest, CacheName};
use url::Url;

/// What the agent caches and where it runs.
#[derive(Clone, Debug)]
pub struct AgentConfig {
    /// Origin (and path scope) the agent controls; manifest paths resolve against it.
    pub scope: Url,
    /// Versioned cache this agent installs into.
    pub cache_name: CacheName,
    /// URLs captured at install time.
    pub manifest: AssetManifest,
    /// Delete sibling cache versions on activate.
    pub purge_stale_caches: bool,
}

impl AgentConfig {
    /// Create a configuration with the default manifest and cache name.
    pub fn new(scope: Url) -> Self {
        Self {
            scope,
            cache_name: CacheName::default(),
            manifest: AssetManifest::default(),
            purge_stale_caches: true,
        }
    }

    pub fn with_cache_name(mut self, cache_name: CacheName) -> Self {
        self.cache_name = cache_name;
        self
    }

    pub fn with_manifest(mut self, manifest: AssetManifest) -> Self {
        self.manifest = manifest;
        self
    }

    pub fn with_purge_stale_caches(mut self, purge: bool) -> Self {
        self.purge_stale_caches = purge;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let scope = Url::parse("http://localhost:8089/").unwrap();
        let config = AgentConfig::new(scope)
            .with_cache_name(CacheName::new("editor", 4).unwrap())
            .with_purge_stale_caches(false);

        assert_eq!(config.cache_name.to_string(), "editor-v4");
        assert!(!config.purge_stale_caches);
        assert_eq!(config.manifest, AssetManifest::default());
    }
}
