//! Delivery configuration.

use cache::{AssetManifest, CacheName};
use delivery_security::{CspAllowList, HeaderSet, HeaderSetError, IsolationProfile};
use indexmap::IndexMap;
use offline::AgentConfig;
use origin::{OriginConfig, DEFAULT_ORIGIN_PORT};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

/// Environment variable overriding the origin port.
pub const ENV_ORIGIN_PORT: &str = "COI_ORIGIN_PORT";
/// Environment variable overriding the asset root.
pub const ENV_ROOT: &str = "COI_ROOT";

/// Default port for the edge handler.
pub const DEFAULT_EDGE_PORT: u16 = 8787;

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Invalid value for {name}: '{value}'")]
    InvalidEnv { name: String, value: String },

    #[error("Invalid header configuration: {0}")]
    Headers(#[from] HeaderSetError),
}

/// Complete configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeliveryConfig {
    /// Origin server settings.
    pub origin: OriginSettings,
    /// Edge handler settings.
    pub edge: EdgeSettings,
    /// Offline agent settings.
    pub offline: OfflineSettings,
    /// Sources allowed by the strict profile's CSP.
    pub csp: CspAllowList,
    /// Headers appended to both profiles.
    pub extra_headers: IndexMap<String, String>,
    /// Optional headers dropped from both profiles.
    pub omit_headers: Vec<String>,
}

/// Origin server settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OriginSettings {
    pub host: IpAddr,
    pub port: u16,
    pub root: PathBuf,
    /// Defaults to `sw.js` inside the root.
    pub service_worker: Option<PathBuf>,
    /// Defaults to `manifest.json` inside the root.
    pub web_manifest: Option<PathBuf>,
    pub profile: IsolationProfile,
    pub self_check: bool,
}

impl Default for OriginSettings {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_ORIGIN_PORT,
            root: PathBuf::from("."),
            service_worker: None,
            web_manifest: None,
            profile: IsolationProfile::Baseline,
            self_check: true,
        }
    }
}

/// Edge handler settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EdgeSettings {
    pub host: IpAddr,
    pub port: u16,
    /// Upstream origin to forward to.
    pub upstream: Option<String>,
    /// Local bundle directory, used when there is no upstream.
    pub root: Option<PathBuf>,
    pub profile: IsolationProfile,
}

impl Default for EdgeSettings {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_EDGE_PORT,
            upstream: None,
            root: None,
            profile: IsolationProfile::Strict,
        }
    }
}

/// Offline agent settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OfflineSettings {
    pub cache_name: CacheName,
    pub manifest: AssetManifest,
    pub purge_stale_caches: bool,
}

impl Default for OfflineSettings {
    fn default() -> Self {
        Self {
            cache_name: CacheName::default(),
            manifest: AssetManifest::default(),
            purge_stale_caches: true,
        }
    }
}

impl DeliveryConfig {
    /// Create a new configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a JSON config file. Missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply `COI_ORIGIN_PORT` and `COI_ROOT` from the process environment.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_env_from(|name| std::env::var(name).ok())
    }

    /// Apply environment overrides from an arbitrary lookup.
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup(ENV_ORIGIN_PORT) {
            self.origin.port = port.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                name: ENV_ORIGIN_PORT.to_string(),
                value: port.clone(),
            })?;
        }
        if let Some(root) = lookup(ENV_ROOT) {
            if root.is_empty() {
                return Err(ConfigError::InvalidEnv {
                    name: ENV_ROOT.to_string(),
                    value: root,
                });
            }
            self.origin.root = PathBuf::from(root);
        }
        Ok(())
    }

    /// Header set the origin enforces.
    pub fn origin_headers(&self) -> Result<HeaderSet, ConfigError> {
        self.header_set(self.origin.profile)
    }

    /// Header set the edge enforces.
    pub fn edge_headers(&self) -> Result<HeaderSet, ConfigError> {
        self.header_set(self.edge.profile)
    }

    fn header_set(&self, profile: IsolationProfile) -> Result<HeaderSet, ConfigError> {
        let mut set = profile.header_set_with_extras(&self.csp, &self.extra_headers)?;
        for name in &self.omit_headers {
            set.remove(name)?;
        }
        Ok(set)
    }

    /// Origin server configuration.
    pub fn origin_config(&self) -> OriginConfig {
        let settings = &self.origin;
        let mut config = OriginConfig::new(&settings.root)
            .with_host(settings.host)
            .with_port(settings.port)
            .with_self_check(settings.self_check)
            .with_manifest(self.offline.manifest.clone());
        if let Some(path) = &settings.service_worker {
            config = config.with_service_worker(path);
        }
        if let Some(path) = &settings.web_manifest {
            config = config.with_web_manifest(path);
        }
        config
    }

    /// Offline agent configuration for an agent running on `scope`.
    pub fn agent_config(&self, scope: Url) -> AgentConfig {
        AgentConfig::new(scope)
            .with_cache_name(self.offline.cache_name.clone())
            .with_manifest(self.offline.manifest.clone())
            .with_purge_stale_caches(self.offline.purge_stale_caches)
    }
}
