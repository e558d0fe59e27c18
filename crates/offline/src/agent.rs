//! Install / fetch / activate lifecycle of the offline cache agent.

use crate::config::AgentConfig;
use crate::error::InstallError;
use cache::{CacheName, CacheStorage, CachedResponse, NamedCache, RequestKey};
use networking::{ClientError, Fetch, Request, Response};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

/// Observable lifecycle state of a registration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AgentState {
    Uninitialized,
    Installing,
    Ready,
    Failed,
}

enum Lifecycle {
    Uninitialized,
    Installing,
    Ready(Arc<CacheAgent>),
    Failed,
}

impl Lifecycle {
    fn state(&self) -> AgentState {
        match self {
            Lifecycle::Uninitialized => AgentState::Uninitialized,
            Lifecycle::Installing => AgentState::Installing,
            Lifecycle::Ready(_) => AgentState::Ready,
            Lifecycle::Failed => AgentState::Failed,
        }
    }
}

/// A registered agent. Owns the lifecycle; hands out a [`CacheAgent`] once installed.
pub struct Registration {
    config: Arc<AgentConfig>,
    storage: Arc<CacheStorage>,
    network: Arc<dyn Fetch>,
    lifecycle: Mutex<Lifecycle>,
}

impl Registration {
    pub fn new(config: AgentConfig, storage: Arc<CacheStorage>, network: Arc<dyn Fetch>) -> Self {
        Self {
            config: Arc::new(config),
            storage,
            network,
            lifecycle: Mutex::new(Lifecycle::Uninitialized),
        }
    }

    pub fn state(&self) -> AgentState {
        self.lifecycle.lock().state()
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// The ready agent, if install has succeeded.
    pub fn controller(&self) -> Option<Arc<CacheAgent>> {
        match &*self.lifecycle.lock() {
            Lifecycle::Ready(agent) => Some(agent.clone()),
            _ => None,
        }
    }

    /// Fetch every manifest URL into the named cache.
    ///
    /// All or nothing: a single failed fetch or non-2xx status fails the
    /// install, and a cache created by this attempt is removed again.
    /// Dropping the returned future part way counts as a failure.
    /// A failed registration may install again.
    pub async fn install(&self) -> Result<Arc<CacheAgent>, InstallError> {
        let mut attempt = self.begin_install()?;

        info!(
            cache = %self.config.cache_name,
            entries = self.config.manifest.len(),
            "installing offline cache"
        );

        match self.populate(&mut attempt).await {
            Ok(cache) => {
                info!(cache = %cache.name(), entries = cache.len(), bytes = cache.size(), "offline cache ready");
                let agent = Arc::new(CacheAgent {
                    config: self.config.clone(),
                    storage: self.storage.clone(),
                    cache,
                    network: self.network.clone(),
                });
                attempt.succeed(agent.clone());
                Ok(agent)
            }
            Err(err) => {
                warn!(
                    cache = %self.config.cache_name,
                    url = err.failed_url(),
                    error = %err,
                    "offline cache install failed"
                );
                Err(err)
            }
        }
    }

    /// Serve a request from the page.
    ///
    /// Before install completes the page is uncontrolled and goes straight
    /// to the network.
    pub async fn handle_request(&self, request: &Request) -> Result<Response, ClientError> {
        match self.controller() {
            Some(agent) => agent.handle_request(request).await,
            None => self.network.fetch(request).await,
        }
    }

    fn begin_install(&self) -> Result<InstallAttempt<'_>, InstallError> {
        let mut lifecycle = self.lifecycle.lock();
        match &*lifecycle {
            Lifecycle::Installing => return Err(InstallError::InProgress),
            Lifecycle::Ready(_) => return Err(InstallError::AlreadyInstalled),
            Lifecycle::Uninitialized | Lifecycle::Failed => {}
        }
        *lifecycle = Lifecycle::Installing;
        Ok(InstallAttempt {
            registration: self,
            created_cache: false,
            completed: false,
        })
    }

    async fn populate(&self, attempt: &mut InstallAttempt<'_>) -> Result<Arc<NamedCache>, InstallError> {
        let urls = self.config.manifest.resolve(&self.config.scope)?;
        let (cache, created) = self.storage.open(&self.config.cache_name);
        attempt.created_cache = created;

        let fetches = urls.into_iter().map(|url| self.fetch_entry(url));
        let batch = futures::future::try_join_all(fetches).await?;
        cache.put_all(batch);
        Ok(cache)
    }

    async fn fetch_entry(&self, url: Url) -> Result<(RequestKey, CachedResponse), InstallError> {
        let request = Request::get(url);
        let response = self
            .network
            .fetch(&request)
            .await
            .map_err(|e| InstallError::Fetch {
                url: request.url_str().to_string(),
                reason: e.to_string(),
            })?;

        if !response.is_success() {
            return Err(InstallError::Status {
                url: request.url_str().to_string(),
                status: response.status().as_u16(),
            });
        }

        debug!(url = %request.url, bytes = response.body().len(), "precached");
        Ok((
            RequestKey::from_request(&request),
            CachedResponse::from_response(&response),
        ))
    }
}

/// One install in flight. Unless it succeeds, dropping it marks the
/// registration failed and deletes the cache it created.
struct InstallAttempt<'a> {
    registration: &'a Registration,
    created_cache: bool,
    completed: bool,
}

impl InstallAttempt<'_> {
    fn succeed(mut self, agent: Arc<CacheAgent>) {
        *self.registration.lifecycle.lock() = Lifecycle::Ready(agent);
        self.completed = true;
    }
}

impl Drop for InstallAttempt<'_> {
    fn drop(&mut self) {
        if self.completed {
            return;
        }
        let registration = self.registration;
        if self.created_cache {
            registration.storage.delete(&registration.config.cache_name);
        }
        *registration.lifecycle.lock() = Lifecycle::Failed;
        debug!(cache = %registration.config.cache_name, "install attempt rolled back");
    }
}

/// An installed agent. Only obtainable from a successful install, so
/// cache reads can never race the install batch.
pub struct CacheAgent {
    config: Arc<AgentConfig>,
    storage: Arc<CacheStorage>,
    cache: Arc<NamedCache>,
    network: Arc<dyn Fetch>,
}

impl CacheAgent {
    /// Cache-first: a hit never touches the network, a miss performs exactly
    /// one fetch whose result is returned as-is and not stored.
    pub async fn handle_request(&self, request: &Request) -> Result<Response, ClientError> {
        if let Some(response) = self.cache.match_request(request) {
            debug!(method = %request.method, url = %request.url, "cache hit");
            return Ok(response);
        }

        debug!(method = %request.method, url = %request.url, "cache miss");
        self.network.fetch(request).await
    }

    /// Purge caches from other versions of this cache name.
    ///
    /// Returns the names that were deleted. Caches with unrelated names
    /// are left alone.
    pub fn activate(&self) -> Vec<CacheName> {
        if !self.config.purge_stale_caches {
            debug!(cache = %self.cache.name(), "stale cache purge disabled");
            return Vec::new();
        }

        let current = self.cache.name();
        let purged: Vec<CacheName> = self
            .storage
            .keys()
            .into_iter()
            .filter_map(|key| key.parse::<CacheName>().ok())
            .filter(|name| name.is_sibling(current))
            .filter(|name| self.storage.delete(name))
            .collect();

        for name in &purged {
            info!(cache = %name, current = %current, "purged stale cache");
        }
        purged
    }

    pub fn cache(&self) -> &Arc<NamedCache> {
        &self.cache
    }

    pub fn cache_name(&self) -> &CacheName {
        self.cache.name()
    }
}

impl fmt::Debug for CacheAgent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheAgent")
            .field("scope", &self.config.scope.as_str())
            .field("cache", &self.cache.name().to_string())
            .field("entries", &self.cache.len())
            .finish_non_exhaustive()
    }
}
