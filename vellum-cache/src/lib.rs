//! Read cache for the vellum content client.
//!
//! Reads are addressed by [`ResourceScope`], a resource type plus ordered
//! scoping parameters rooted at the project. The [`keys`] registry is the only
//! place scopes are built, so the scope a view subscribes to and the scope a
//! mutation invalidates are always the same value.
//!
//! # Example
//!
//! ```ignore
//! let cache = QueryCache::default();
//! let folders = cache
//!     .get_or_fetch(&ContentKeys::folders("proj1"), Freshness::consistent(), &fetcher)
//!     .await?;
//!
//! // after a write
//! cache.invalidate(&ContentKeys::folders("proj1")).await;
//! ```

pub mod error;
pub mod freshness;
pub mod keys;
pub mod query_cache;
pub mod scope;
pub mod traits;

pub use error::{CacheError, CacheResult};
pub use freshness::{CacheRead, Freshness};
pub use keys::{scope_for, ContentKeys, ScopeQuery};
pub use query_cache::{CacheConfig, QueryCache};
pub use scope::{ResourceScope, ResourceType};
pub use traits::{CacheInvalidator, CacheStats, QueryFetcher};
