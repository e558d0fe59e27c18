//! Named, versioned response caches for offline delivery.

pub mod entry;
pub mod key;
pub mod manifest;
pub mod name;
pub mod storage;

pub use entry::CachedResponse;
pub use key::RequestKey;
pub use manifest::AssetManifest;
pub use name::CacheName;
pub use storage::{CacheStorage, NamedCache};
