//! Short-lived caching of market lookups to reduce upstream calls

use cached::{Cached, TimedCache};
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Cache key for market data requests
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Stock symbol, or a fixed name for aggregate views
    pub symbol: String,
    /// Operation the value was produced by
    pub endpoint: &'static str,
}

impl CacheKey {
    /// Create a new cache key
    pub fn new(symbol: impl Into<String>, endpoint: &'static str) -> Self {
        Self {
            symbol: symbol.into(),
            endpoint,
        }
    }
}

/// Thread-safe TTL cache shared between request handlers
pub struct StockCache<V> {
    cache: Arc<Mutex<TimedCache<CacheKey, V>>>,
}

impl<V: Clone> StockCache<V> {
    /// Create a new cache with specified TTL
    pub fn new(ttl: Duration) -> Self {
        Self {
            cache: Arc::new(Mutex::new(TimedCache::with_lifespan(ttl))),
        }
    }

    /// Get a value from the cache
    pub async fn get(&self, key: &CacheKey) -> Option<V> {
        let mut cache = self.cache.lock().await;
        cache.cache_get(key).cloned()
    }

    /// Insert a value into the cache
    pub async fn insert(&self, key: CacheKey, value: V) {
        let mut cache = self.cache.lock().await;
        let _ = cache.cache_set(key, value);
    }

    /// Get or fetch a value using the provided fetcher function
    ///
    /// Errors from the fetcher are returned as-is and nothing is cached.
    pub async fn get_or_fetch<F, Fut, E>(&self, key: CacheKey, fetcher: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<V, E>>,
    {
        if let Some(value) = self.get(&key).await {
            tracing::debug!(symbol = %key.symbol, endpoint = key.endpoint, "cache hit");
            return Ok(value);
        }

        tracing::debug!(symbol = %key.symbol, endpoint = key.endpoint, "cache miss");

        let value = fetcher().await?;
        self.insert(key, value.clone()).await;

        Ok(value)
    }
}

impl<V> Clone for StockCache<V> {
    fn clone(&self) -> Self {
        Self {
            cache: Arc::clone(&self.cache),
        }
    }
}
