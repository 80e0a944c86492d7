//! Result caching with TTL support.
//!
//! This crate provides the cache that sits in front of idempotent platform
//! reads, so repeated analyses of the same repository inside the TTL window
//! neither call the platform nor spend quota.

#![warn(missing_docs)]

mod cache;
mod fingerprint;

pub use cache::{CacheEntry, ResultCache, ResultCacheConfig, ResultCacheConfigBuilder};
pub use fingerprint::Fingerprint;
