//! Time-to-live cache for pool metrics.
//!
//! Pool metrics change slowly and are expensive to fetch, so they are
//! kept for a configurable TTL (five minutes by default). The clock is
//! injected so tests can move time forward by hand.

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;

use super::PoolMetricsSource;
use crate::domain::PoolMetrics;
use crate::error::GatewayError;

/// Source of the current time.
pub trait Clock: Send + Sync + Debug {
    /// Returns the current instant.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    millis: Arc<AtomicI64>,
}

impl ManualClock {
    /// Starts the clock at `start`.
    #[must_use]
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            millis: Arc::new(AtomicI64::new(start.timestamp_millis())),
        }
    }

    /// Moves the clock forward by `by`.
    pub fn advance(&self, by: Duration) {
        self.millis.fetch_add(by.num_milliseconds(), Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.millis.load(Ordering::SeqCst)).unwrap_or_default()
    }
}

/// Key-value cache whose entries expire `ttl` after insertion.
#[derive(Debug)]
pub struct TtlCache<K, V, C> {
    ttl: Duration,
    clock: C,
    entries: RwLock<HashMap<K, (V, DateTime<Utc>)>>,
}

impl<K, V, C> TtlCache<K, V, C>
where
    K: Eq + Hash,
    V: Clone,
    C: Clock,
{
    /// Creates an empty cache.
    #[must_use]
    pub fn new(ttl: Duration, clock: C) -> Self {
        Self {
            ttl,
            clock,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the cached value if it has not expired.
    pub async fn get(&self, key: &K) -> Option<V> {
        let now = self.clock.now();
        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|(_, inserted_at)| now - *inserted_at < self.ttl)
            .map(|(value, _)| value.clone())
    }

    /// Inserts or refreshes an entry, dropping every expired one.
    pub async fn insert(&self, key: K, value: V) {
        let now = self.clock.now();
        let mut entries = self.entries.write().await;
        entries.retain(|_, (_, inserted_at)| now - *inserted_at < self.ttl);
        entries.insert(key, (value, now));
    }

    /// Drops every entry.
    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    /// Number of stored entries, expired or not.
    pub async fn entry_count(&self) -> usize {
        self.entries.read().await.len()
    }
}

/// [`PoolMetricsSource`] that serves from a [`TtlCache`] and only asks
/// the inner source for pools that are missing or expired.
///
/// Pools the inner source does not know are cached as `None`, so they
/// stay absent from results for the TTL without being refetched.
#[derive(Debug)]
pub struct CachedPoolMetrics<C> {
    inner: Arc<dyn PoolMetricsSource>,
    cache: TtlCache<String, Option<PoolMetrics>, C>,
}

impl<C: Clock> CachedPoolMetrics<C> {
    /// Wraps `inner` with `cache`.
    #[must_use]
    pub fn new(
        inner: Arc<dyn PoolMetricsSource>,
        cache: TtlCache<String, Option<PoolMetrics>, C>,
    ) -> Self {
        Self { inner, cache }
    }
}

#[async_trait]
impl<C: Clock + 'static> PoolMetricsSource for CachedPoolMetrics<C> {
    async fn pool_metrics(
        &self,
        pool_ids: &[String],
    ) -> Result<HashMap<String, PoolMetrics>, GatewayError> {
        let mut found = HashMap::with_capacity(pool_ids.len());
        let mut missing = Vec::new();
        for id in pool_ids {
            match self.cache.get(id).await {
                Some(Some(metrics)) => {
                    found.insert(id.clone(), metrics);
                }
                Some(None) => {}
                None => missing.push(id.clone()),
            }
        }

        if !missing.is_empty() {
            let cached = self.cache.entry_count().await;
            tracing::debug!(
                hits = found.len(),
                misses = missing.len(),
                cached,
                "pool metrics cache miss"
            );
            let mut fetched = self.inner.pool_metrics(&missing).await?;
            for id in missing {
                let metrics = fetched.remove(&id);
                self.cache.insert(id.clone(), metrics).await;
                if let Some(metrics) = metrics {
                    found.insert(id, metrics);
                }
            }
        }
        Ok(found)
    }

    async fn invalidate(&self) {
        self.cache.clear().await;
        self.inner.invalidate().await;
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[derive(Debug, Default)]
    struct CountingSource {
        calls: AtomicUsize,
        tvl: AtomicI64,
    }

    #[async_trait]
    impl PoolMetricsSource for CountingSource {
        async fn pool_metrics(
            &self,
            pool_ids: &[String],
        ) -> Result<HashMap<String, PoolMetrics>, GatewayError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let tvl = u128::try_from(self.tvl.load(Ordering::SeqCst)).unwrap_or(0);
            Ok(pool_ids
                .iter()
                .filter(|id| id.as_str() != "unknown")
                .map(|id| (id.clone(), PoolMetrics { tvl, apy: 5.0 }))
                .collect())
        }
    }

    fn cached(
        source: &Arc<CountingSource>,
        clock: &ManualClock,
    ) -> CachedPoolMetrics<ManualClock> {
        CachedPoolMetrics::new(
            Arc::clone(source) as Arc<dyn PoolMetricsSource>,
            TtlCache::new(Duration::minutes(5), clock.clone()),
        )
    }

    #[tokio::test]
    async fn entries_expire_after_ttl() {
        let clock = ManualClock::new(Utc::now());
        let cache: TtlCache<&str, u32, _> = TtlCache::new(Duration::seconds(10), clock.clone());
        cache.insert("a", 1).await;
        assert_eq!(cache.get(&"a").await, Some(1));

        clock.advance(Duration::seconds(9));
        assert_eq!(cache.get(&"a").await, Some(1));

        clock.advance(Duration::seconds(1));
        assert_eq!(cache.get(&"a").await, None);
        assert_eq!(cache.entry_count().await, 1);

        cache.insert("b", 2).await;
        assert_eq!(cache.entry_count().await, 1);
        assert_eq!(cache.get(&"b").await, Some(2));
    }

    #[tokio::test]
    async fn second_read_within_ttl_is_served_from_cache() {
        let source = Arc::new(CountingSource::default());
        let clock = ManualClock::new(Utc::now());
        let metrics = cached(&source, &clock);
        let ids = vec!["p1".to_string(), "p2".to_string()];

        let Ok(first) = metrics.pool_metrics(&ids).await else {
            panic!("first fetch failed");
        };
        let Ok(second) = metrics.pool_metrics(&ids).await else {
            panic!("second fetch failed");
        };
        assert_eq!(first, second);
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn expired_entries_are_refetched() {
        let source = Arc::new(CountingSource::default());
        let clock = ManualClock::new(Utc::now());
        let metrics = cached(&source, &clock);
        let ids = vec!["p1".to_string()];

        let _ = metrics.pool_metrics(&ids).await;
        source.tvl.store(77, Ordering::SeqCst);
        clock.advance(Duration::minutes(6));

        let Ok(refreshed) = metrics.pool_metrics(&ids).await else {
            panic!("refetch failed");
        };
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
        assert_eq!(refreshed.get("p1").map(|m| m.tvl), Some(77));
    }

    #[tokio::test]
    async fn unknown_pools_are_absent_and_invalidate_clears() {
        let source = Arc::new(CountingSource::default());
        let clock = ManualClock::new(Utc::now());
        let metrics = cached(&source, &clock);

        let unknown = vec!["unknown".to_string()];
        let Ok(found) = metrics.pool_metrics(&unknown).await else {
            panic!("fetch failed");
        };
        assert!(found.is_empty());

        let Ok(again) = metrics.pool_metrics(&unknown).await else {
            panic!("cached fetch failed");
        };
        assert!(again.is_empty());
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);

        let ids = vec!["p1".to_string()];
        let _ = metrics.pool_metrics(&ids).await;
        metrics.invalidate().await;
        let _ = metrics.pool_metrics(&ids).await;
        assert_eq!(source.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn unknown_pools_are_refetched_after_ttl() {
        let source = Arc::new(CountingSource::default());
        let clock = ManualClock::new(Utc::now());
        let metrics = cached(&source, &clock);
        let unknown = vec!["unknown".to_string()];

        let _ = metrics.pool_metrics(&unknown).await;
        clock.advance(Duration::minutes(6));
        let _ = metrics.pool_metrics(&unknown).await;
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }
}
