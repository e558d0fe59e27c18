//! Offline cache agent.
//!
//! Models the service worker that precaches the asset manifest:
//! - `install` fetches every manifest URL into a fresh named cache, all or nothing
//! - requests are answered cache-first, falling back to the network
//! - `activate` purges caches left behind by earlier versions

pub mod agent;
pub mod config;
pub mod error;

pub use agent::{AgentState, CacheAgent, Registration};
pub use config::AgentConfig;
pub use error::InstallError;
