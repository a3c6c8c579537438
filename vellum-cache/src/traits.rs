//! Cache capability traits.
//!
//! The mutation layer only ever sees [`CacheInvalidator`]; it never reads or
//! writes entry contents. Views populate the cache through a [`QueryFetcher`].

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::error::CacheResult;
use crate::scope::ResourceScope;

/// The invalidation entry point of the read cache.
///
/// Implementations must be idempotent: invalidating the same scope twice in
/// a row leaves the cache in the same observable state as doing it once.
/// When the returned future resolves, no entry covered by `scope` may answer
/// a read with data cached before the call.
#[async_trait]
pub trait CacheInvalidator: Send + Sync {
    /// Invalidate every entry covered by `scope`, returning how many were dropped.
    async fn invalidate(&self, scope: &ResourceScope) -> u64;
}

/// Loads data for a scope on a cache miss.
#[async_trait]
pub trait QueryFetcher<T: DeserializeOwned + Send>: Send + Sync {
    async fn fetch(&self, scope: &ResourceScope) -> CacheResult<T>;
}

/// Statistics about cache usage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of reads served from a live entry.
    pub hits: u64,
    /// Number of reads that had to go to the fetcher.
    pub misses: u64,
    /// Number of entries currently in cache.
    pub entry_count: u64,
    /// Number of `invalidate` calls received.
    pub invalidations: u64,
    /// Number of entries dropped by invalidation.
    pub evicted: u64,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
