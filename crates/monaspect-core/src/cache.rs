//! In-memory cache of the last successful batch per cache key.

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Monotonic time source injected into the cache.
pub trait Clock: Send + Sync + Debug {
    fn now(&self) -> Instant;
}

/// Wall clock used in production.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    offset: Mutex<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut offset = self.offset.lock().expect("manual clock lock poisoned");
        *offset += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        let offset = *self.offset.lock().expect("manual clock lock poisoned");
        self.origin + offset
    }
}

#[derive(Debug)]
struct CacheEntry<T> {
    payload: Arc<[T]>,
    source: String,
    fetched_at: Instant,
    ttl: Duration,
}

/// Snapshot of a cached batch as seen at lookup time.
#[derive(Debug, Clone)]
pub struct CachedBatch<T> {
    pub payload: Arc<[T]>,
    pub source: String,
    pub age: Duration,
    pub ttl: Duration,
}

impl<T> CachedBatch<T> {
    /// Fresh while `age < ttl`; afterwards only usable as a stale fallback.
    pub fn is_fresh(&self) -> bool {
        self.age < self.ttl
    }
}

/// Thread-safe store keyed by strings such as `market:top20` or
/// `history:BTC:1D`. Entries are overwritten on success and never evicted.
#[derive(Debug)]
pub struct FetchCache<T> {
    inner: Arc<tokio::sync::RwLock<HashMap<String, CacheEntry<T>>>>,
    clock: Arc<dyn Clock>,
}

impl<T> Clone for FetchCache<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<T> FetchCache<T> {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(tokio::sync::RwLock::new(HashMap::new())),
            clock,
        }
    }

    /// Latest entry for `key`, fresh or stale.
    pub async fn lookup(&self, key: &str) -> Option<CachedBatch<T>> {
        let store = self.inner.read().await;
        let entry = store.get(key)?;
        Some(CachedBatch {
            payload: Arc::clone(&entry.payload),
            source: entry.source.clone(),
            age: self.clock.now().saturating_duration_since(entry.fetched_at),
            ttl: entry.ttl,
        })
    }

    /// Latest entry only if it is still fresh.
    pub async fn fresh(&self, key: &str) -> Option<CachedBatch<T>> {
        self.lookup(key).await.filter(CachedBatch::is_fresh)
    }

    pub async fn store(
        &self,
        key: impl Into<String>,
        payload: Arc<[T]>,
        source: impl Into<String>,
        ttl: Duration,
    ) {
        let entry = CacheEntry {
            payload,
            source: source.into(),
            fetched_at: self.clock.now(),
            ttl,
        };
        let mut store = self.inner.write().await;
        store.insert(key.into(), entry);
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache() -> (FetchCache<u32>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        (FetchCache::new(clock.clone()), clock)
    }

    #[tokio::test]
    async fn miss_then_fresh_hit() {
        let (cache, _) = cache();
        assert!(cache.lookup("market:top20").await.is_none());

        cache
            .store("market:top20", Arc::from(vec![1, 2, 3]), "CoinGecko", Duration::from_secs(60))
            .await;

        let hit = cache.fresh("market:top20").await.expect("fresh hit");
        assert_eq!(&*hit.payload, &[1, 2, 3]);
        assert_eq!(hit.source, "CoinGecko");
    }

    #[tokio::test]
    async fn entry_goes_stale_exactly_at_ttl() {
        let (cache, clock) = cache();
        cache
            .store("k", Arc::from(vec![7]), "CoinCap", Duration::from_secs(60))
            .await;

        clock.advance(Duration::from_secs(59));
        assert!(cache.fresh("k").await.is_some());

        clock.advance(Duration::from_secs(1));
        assert!(cache.fresh("k").await.is_none());
        let stale = cache.lookup("k").await.expect("stale entry kept");
        assert!(!stale.is_fresh());
        assert_eq!(stale.age, Duration::from_secs(60));
    }

    #[tokio::test]
    async fn store_overwrites_and_resets_age() {
        let (cache, clock) = cache();
        cache
            .store("k", Arc::from(vec![1]), "A", Duration::from_secs(10))
            .await;
        clock.advance(Duration::from_secs(30));
        cache
            .store("k", Arc::from(vec![2]), "B", Duration::from_secs(10))
            .await;

        let hit = cache.fresh("k").await.expect("fresh after overwrite");
        assert_eq!(&*hit.payload, &[2]);
        assert_eq!(hit.age, Duration::ZERO);
        assert_eq!(cache.len().await, 1);
    }
}
