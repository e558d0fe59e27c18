//! In-memory cache storage scoped by cache name.

use crate::entry::CachedResponse;
use crate::key::RequestKey;
use crate::name::CacheName;
use indexmap::IndexMap;
use networking::{Request, Response};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// One named store of request/response pairs.
///
/// Entries are only ever written as a whole batch.
pub struct NamedCache {
    name: CacheName,
    entries: RwLock<HashMap<RequestKey, CachedResponse>>,
}

impl NamedCache {
    fn new(name: CacheName) -> Self {
        Self {
            name,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn name(&self) -> &CacheName {
        &self.name
    }

    /// Look up a request.
    pub fn match_request(&self, request: &Request) -> Option<Response> {
        self.match_key(&RequestKey::from_request(request))
            .map(|entry| entry.to_response())
    }

    pub fn match_key(&self, key: &RequestKey) -> Option<CachedResponse> {
        self.entries.read().get(key).cloned()
    }

    /// Store a batch of entries under one write lock.
    pub fn put_all(&self, batch: Vec<(RequestKey, CachedResponse)>) {
        let mut entries = self.entries.write();
        for (key, entry) in batch {
            entries.insert(key, entry);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Total body bytes stored.
    pub fn size(&self) -> usize {
        self.entries.read().values().map(CachedResponse::size).sum()
    }
}

/// All named caches of one origin.
#[derive(Default)]
pub struct CacheStorage {
    caches: RwLock<IndexMap<String, Arc<NamedCache>>>,
}

impl CacheStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a cache, creating it if absent.
    ///
    /// The flag is `true` when this call created the cache.
    pub fn open(&self, name: &CacheName) -> (Arc<NamedCache>, bool) {
        let key = name.to_string();
        if let Some(cache) = self.caches.read().get(&key) {
            return (cache.clone(), false);
        }

        let mut caches = self.caches.write();
        // Another caller may have created it between the two locks.
        if let Some(cache) = caches.get(&key) {
            return (cache.clone(), false);
        }
        let cache = Arc::new(NamedCache::new(name.clone()));
        caches.insert(key, cache.clone());
        tracing::debug!(cache = %name, "created cache");
        (cache, true)
    }

    /// Get an existing cache.
    pub fn get(&self, name: &CacheName) -> Option<Arc<NamedCache>> {
        self.caches.read().get(&name.to_string()).cloned()
    }

    pub fn has(&self, name: &CacheName) -> bool {
        self.caches.read().contains_key(&name.to_string())
    }

    /// Delete a cache. Returns whether it existed.
    pub fn delete(&self, name: &CacheName) -> bool {
        self.caches.write().shift_remove(&name.to_string()).is_some()
    }

    /// Names of all caches in creation order.
    pub fn keys(&self) -> Vec<String> {
        self.caches.read().keys().cloned().collect()
    }
}
