//! Request cache for the fetch-based orchestrators
//!
//! Keys are derived from the full request identity (indices, query, page
//! size, page, immediate flag), so a repeated key is answered without a new
//! round trip while a changed key always misses.

use crate::config::SearchOptions;
use crate::results::SearchResponse;
use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;

/// Cache of raw combined-query responses
#[derive(Clone)]
pub struct RequestCache {
    cache: Cache<String, Arc<Vec<SearchResponse>>>,
}

impl RequestCache {
    /// Create a cache with the given TTL and capacity
    pub fn new(ttl_seconds: u64, max_capacity: u64) -> Self {
        let cache = Cache::builder()
            .time_to_live(Duration::from_secs(ttl_seconds))
            .max_capacity(max_capacity)
            .build();

        Self { cache }
    }

    /// Get cached responses for a request key
    pub async fn get(&self, key: &str) -> Option<Arc<Vec<SearchResponse>>> {
        self.cache.get(key).await
    }

    /// Store responses for a request key
    pub async fn set(&self, key: String, responses: Arc<Vec<SearchResponse>>) {
        self.cache.insert(key, responses).await;
    }

    /// Drop all cached entries
    pub fn clear(&self) {
        self.cache.invalidate_all();
    }

    /// Number of cached entries
    pub fn size(&self) -> u64 {
        self.cache.entry_count()
    }
}

impl Default for RequestCache {
    fn default() -> Self {
        Self::new(300, 1000) // 5 minutes TTL, 1k request keys
    }
}

/// Derive the cache key for a combined request
pub fn request_cache_key(index_names: &[String], query: &str, options: &SearchOptions) -> String {
    use sha2::{Digest, Sha256};

    let mut hasher = Sha256::new();
    for name in index_names {
        hasher.update(name.as_bytes());
        hasher.update([0]);
    }
    hasher.update(query.as_bytes());
    hasher.update([0]);
    hasher.update(options.hits_per_page.map(|v| v as i64).unwrap_or(-1).to_le_bytes());
    hasher.update(options.page.map(|v| v as i64).unwrap_or(-1).to_le_bytes());
    hasher.update([options.immediate as u8]);

    format!("{:x}", hasher.finalize())
}
