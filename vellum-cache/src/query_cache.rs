//! In-memory read cache keyed by [`ResourceScope`].
//!
//! Entries are stored as JSON values with the time they were cached.
//! Invalidation removes every entry covered by the given scope and bumps a
//! sequence number; a read-through fetch that started before a covering
//! invalidation hands its data back to the caller but does not store it.
//!
//! The invalidation ledger only keeps sequences newer than the oldest fetch
//! still in flight, and is empty whenever no fetch is running.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::RwLock;

use crate::error::{CacheError, CacheResult};
use crate::freshness::{CacheRead, Freshness};
use crate::scope::ResourceScope;
use crate::traits::{CacheInvalidator, CacheStats, QueryFetcher};

/// Configuration for the query cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Staleness tolerance used by [`QueryCache::get_or_fetch_default`].
    pub default_max_staleness: Duration,
    /// Maximum number of live entries; the oldest entry is evicted past this.
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_max_staleness: Duration::from_secs(60),
            max_entries: 10_000,
        }
    }
}

impl CacheConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_staleness(mut self, duration: Duration) -> Self {
        self.default_max_staleness = duration;
        self
    }

    /// A limit of zero disables storage; reads always go to the fetcher.
    pub fn with_max_entries(mut self, max: usize) -> Self {
        self.max_entries = max;
        self
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: serde_json::Value,
    cached_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<ResourceScope, CacheEntry>,
    /// Last invalidation sequence per invalidated scope, pruned to what
    /// in-flight fetches can still observe.
    invalidated_at: HashMap<ResourceScope, u64>,
    sequence: u64,
    stats: CacheStats,
}

impl CacheState {
    fn invalidated_since(&self, scope: &ResourceScope, sequence: u64) -> bool {
        self.invalidated_at
            .iter()
            .any(|(invalidated, seq)| *seq > sequence && invalidated.covers(scope))
    }

    /// Drop ledger entries no running fetch started before.
    fn prune_ledger(&mut self, oldest_in_flight: Option<u64>) {
        match oldest_in_flight {
            Some(oldest) => self.invalidated_at.retain(|_, seq| *seq > oldest),
            None => self.invalidated_at.clear(),
        }
    }

    fn insert(&mut self, scope: ResourceScope, entry: CacheEntry, max_entries: usize) {
        if max_entries == 0 {
            return;
        }
        if !self.entries.contains_key(&scope) && self.entries.len() >= max_entries {
            let oldest = self
                .entries
                .iter()
                .min_by_key(|(_, e)| e.cached_at)
                .map(|(s, _)| s.clone());
            if let Some(oldest) = oldest {
                self.entries.remove(&oldest);
            }
        }
        self.entries.insert(scope, entry);
        self.stats.entry_count = self.entries.len() as u64;
    }
}

/// Start sequences of read-through fetches that have not finished.
///
/// Guarded by a sync mutex so a dropped fetch can deregister itself.
#[derive(Debug, Default)]
struct InFlight(Mutex<BTreeMap<u64, usize>>);

impl InFlight {
    fn with<R>(&self, f: impl FnOnce(&mut BTreeMap<u64, usize>) -> R) -> R {
        match self.0.lock() {
            Ok(mut fetches) => f(&mut fetches),
            Err(poisoned) => f(&mut poisoned.into_inner()),
        }
    }

    fn oldest(&self) -> Option<u64> {
        self.with(|fetches| fetches.keys().next().copied())
    }
}

/// Registration of one running fetch; released on drop.
struct FetchTicket {
    in_flight: Arc<InFlight>,
    start_sequence: u64,
}

impl FetchTicket {
    fn register(in_flight: &Arc<InFlight>, start_sequence: u64) -> Self {
        in_flight.with(|fetches| *fetches.entry(start_sequence).or_insert(0) += 1);
        Self {
            in_flight: Arc::clone(in_flight),
            start_sequence,
        }
    }
}

impl Drop for FetchTicket {
    fn drop(&mut self) {
        let sequence = self.start_sequence;
        self.in_flight.with(|fetches| {
            if let Some(count) = fetches.get_mut(&sequence) {
                *count -= 1;
                if *count == 0 {
                    fetches.remove(&sequence);
                }
            }
        });
    }
}

/// Process-wide read cache shared by views and the mutation layer.
///
/// Cloning is cheap and yields a handle to the same cache.
#[derive(Clone, Default)]
pub struct QueryCache {
    state: Arc<RwLock<CacheState>>,
    in_flight: Arc<InFlight>,
    config: CacheConfig,
}

impl QueryCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            state: Arc::new(RwLock::new(CacheState::default())),
            in_flight: Arc::default(),
            config,
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Store a value under `scope`, replacing any previous entry.
    pub async fn put<T: Serialize>(&self, scope: &ResourceScope, value: &T) -> CacheResult<()> {
        let value = serde_json::to_value(value).map_err(|source| CacheError::Encode {
            scope: scope.clone(),
            source,
        })?;
        let mut state = self.state.write().await;
        state.insert(
            scope.clone(),
            CacheEntry {
                value,
                cached_at: Utc::now(),
            },
            self.config.max_entries,
        );
        Ok(())
    }

    /// Read a live entry without going to a fetcher.
    pub async fn get<T: DeserializeOwned>(
        &self,
        scope: &ResourceScope,
    ) -> CacheResult<Option<CacheRead<T>>> {
        let entry = {
            let mut state = self.state.write().await;
            let entry = state.entries.get(scope).cloned();
            if entry.is_some() {
                state.stats.hits += 1;
            } else {
                state.stats.misses += 1;
            }
            entry
        };
        match entry {
            Some(entry) => {
                let value = decode(scope, entry.value)?;
                Ok(Some(CacheRead::from_cache(value, entry.cached_at)))
            }
            None => Ok(None),
        }
    }

    /// Whether a live entry exists for exactly this scope.
    pub async fn contains(&self, scope: &ResourceScope) -> bool {
        self.state.read().await.entries.contains_key(scope)
    }

    /// Read-through lookup under an explicit freshness contract.
    pub async fn get_or_fetch<T, F>(
        &self,
        scope: &ResourceScope,
        freshness: Freshness,
        fetcher: &F,
    ) -> CacheResult<CacheRead<T>>
    where
        T: Serialize + DeserializeOwned + Send,
        F: QueryFetcher<T> + ?Sized,
    {
        let cached = self.state.read().await.entries.get(scope).cloned();

        if let Some(entry) = cached {
            if freshness.accepts(entry.cached_at, Utc::now()) {
                self.state.write().await.stats.hits += 1;
                let value = decode(scope, entry.value)?;
                return Ok(CacheRead::from_cache(value, entry.cached_at));
            }
        }

        let ticket = {
            let state = self.state.read().await;
            FetchTicket::register(&self.in_flight, state.sequence)
        };
        let fetched = fetcher.fetch(scope).await?;
        let encoded = serde_json::to_value(&fetched).map_err(|source| CacheError::Encode {
            scope: scope.clone(),
            source,
        })?;

        let mut state = self.state.write().await;
        state.stats.misses += 1;
        if state.invalidated_since(scope, ticket.start_sequence) {
            tracing::debug!(scope = %scope, "discarding fetch that raced an invalidation");
        } else {
            state.insert(
                scope.clone(),
                CacheEntry {
                    value: encoded,
                    cached_at: Utc::now(),
                },
                self.config.max_entries,
            );
        }
        drop(ticket);
        state.prune_ledger(self.in_flight.oldest());
        Ok(CacheRead::from_fetch(fetched))
    }

    /// Read-through lookup using the configured default staleness.
    pub async fn get_or_fetch_default<T, F>(
        &self,
        scope: &ResourceScope,
        fetcher: &F,
    ) -> CacheResult<CacheRead<T>>
    where
        T: Serialize + DeserializeOwned + Send,
        F: QueryFetcher<T> + ?Sized,
    {
        let freshness = Freshness::best_effort(self.config.default_max_staleness);
        self.get_or_fetch(scope, freshness, fetcher).await
    }

    /// Current invalidation sequence number.
    pub async fn sequence(&self) -> u64 {
        self.state.read().await.sequence
    }

    /// Scopes of all live entries, sorted.
    pub async fn scopes(&self) -> Vec<ResourceScope> {
        let mut scopes: Vec<_> = self.state.read().await.entries.keys().cloned().collect();
        scopes.sort();
        scopes
    }

    pub async fn stats(&self) -> CacheStats {
        self.state.read().await.stats.clone()
    }

    /// Drop every entry.
    pub async fn clear(&self) {
        let mut state = self.state.write().await;
        state.entries.clear();
        state.stats.entry_count = 0;
    }
}

#[async_trait]
impl CacheInvalidator for QueryCache {
    async fn invalidate(&self, scope: &ResourceScope) -> u64 {
        let mut state = self.state.write().await;
        state.sequence += 1;
        let sequence = state.sequence;
        state.invalidated_at.insert(scope.clone(), sequence);
        state.prune_ledger(self.in_flight.oldest());

        let before = state.entries.len();
        state.entries.retain(|cached, _| !scope.covers(cached));
        let removed = (before - state.entries.len()) as u64;

        state.stats.invalidations += 1;
        state.stats.evicted += removed;
        state.stats.entry_count = state.entries.len() as u64;
        tracing::debug!(scope = %scope, removed, sequence, "cache scope invalidated");
        removed
    }
}

fn decode<T: DeserializeOwned>(scope: &ResourceScope, value: serde_json::Value) -> CacheResult<T> {
    serde_json::from_value(value).map_err(|source| CacheError::Decode {
        scope: scope.clone(),
        source,
    })
}
