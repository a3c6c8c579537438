//! Error types for the read cache.

use crate::scope::ResourceScope;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Failed to encode cache entry for {scope}: {source}")]
    Encode {
        scope: ResourceScope,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to decode cache entry for {scope}: {source}")]
    Decode {
        scope: ResourceScope,
        #[source]
        source: serde_json::Error,
    },

    #[error("Fetch failed for {scope}: {reason}")]
    FetchFailed { scope: ResourceScope, reason: String },
}

pub type CacheResult<T> = Result<T, CacheError>;
