//! Freshness contracts for cache reads.
//!
//! Callers state their staleness tolerance up front and every read comes
//! back wrapped in a [`CacheRead`] that says where the data came from.

use chrono::{DateTime, Utc};
use std::time::Duration;

/// Freshness requirement for a read-through lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Freshness {
    /// Serve a live cached entry if it is no older than `max_staleness`,
    /// otherwise go to the fetcher.
    BestEffort { max_staleness: Duration },

    /// Always go to the fetcher and refresh the cached entry.
    Consistent,
}

impl Freshness {
    pub fn best_effort(max_staleness: Duration) -> Self {
        Self::BestEffort { max_staleness }
    }

    pub fn consistent() -> Self {
        Self::Consistent
    }

    /// Get the max staleness for BestEffort, or zero for Consistent.
    pub fn max_staleness(&self) -> Duration {
        match self {
            Self::BestEffort { max_staleness } => *max_staleness,
            Self::Consistent => Duration::ZERO,
        }
    }

    /// Whether an entry cached at `cached_at` may be served under this contract.
    pub fn accepts(&self, cached_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        match self {
            Self::Consistent => false,
            Self::BestEffort { max_staleness } => {
                let age = now
                    .signed_duration_since(cached_at)
                    .to_std()
                    .unwrap_or(Duration::ZERO);
                age <= *max_staleness
            }
        }
    }
}

impl Default for Freshness {
    fn default() -> Self {
        Self::BestEffort {
            max_staleness: Duration::from_secs(60),
        }
    }
}

/// Result of a cache read, carrying staleness metadata.
#[derive(Debug, Clone)]
pub struct CacheRead<T> {
    value: T,
    cached_at: DateTime<Utc>,
    was_cache_hit: bool,
}

impl<T> CacheRead<T> {
    /// A read served from a live cache entry.
    pub fn from_cache(value: T, cached_at: DateTime<Utc>) -> Self {
        Self {
            value,
            cached_at,
            was_cache_hit: true,
        }
    }

    /// A read that went to the fetcher.
    pub fn from_fetch(value: T) -> Self {
        Self {
            value,
            cached_at: Utc::now(),
            was_cache_hit: false,
        }
    }

    pub fn into_value(self) -> T {
        self.value
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn cached_at(&self) -> DateTime<Utc> {
        self.cached_at
    }

    pub fn was_cache_hit(&self) -> bool {
        self.was_cache_hit
    }

    pub fn was_cache_miss(&self) -> bool {
        !self.was_cache_hit
    }

    /// How old the data is right now.
    pub fn staleness(&self) -> Duration {
        Utc::now()
            .signed_duration_since(self.cached_at)
            .to_std()
            .unwrap_or(Duration::ZERO)
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> CacheRead<U> {
        CacheRead {
            value: f(self.value),
            cached_at: self.cached_at,
            was_cache_hit: self.was_cache_hit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_consistent_never_accepts_cached() {
        let now = Utc::now();
        assert!(!Freshness::consistent().accepts(now, now));
        assert_eq!(Freshness::consistent().max_staleness(), Duration::ZERO);
    }

    #[test]
    fn test_best_effort_window() {
        let now = Utc::now();
        let freshness = Freshness::best_effort(Duration::from_secs(30));
        assert!(freshness.accepts(now - chrono::Duration::seconds(10), now));
        assert!(!freshness.accepts(now - chrono::Duration::seconds(31), now));
    }

    #[test]
    fn test_cache_read_flags() {
        let hit = CacheRead::from_cache(1u32, Utc::now());
        assert!(hit.was_cache_hit());
        let miss = CacheRead::from_fetch(2u32).map(|v| v * 2);
        assert!(miss.was_cache_miss());
        assert_eq!(miss.into_value(), 4);
    }
}
