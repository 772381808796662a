//! Data source ports and their adapters.
//!
//! The portfolio service reads market data through four async traits.
//! [`memory::InMemoryMarketStore`] implements all of them;
//! [`cache::CachedPoolMetrics`] wraps any [`PoolMetricsSource`] with a TTL
//! cache.

pub mod cache;
pub mod memory;

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{ApySnapshot, EventRecord, PoolMetrics, StrategySnapshot};
use crate::error::GatewayError;

pub use cache::{CachedPoolMetrics, Clock, ManualClock, SystemClock, TtlCache};
pub use memory::{InMemoryMarketStore, MarketSeed};

/// Whether the market snapshot holds real data yet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataStatus {
    /// No snapshot has been ingested; an empty list means "unknown".
    #[default]
    Loading,
    /// At least one snapshot was ingested; an empty list means "none".
    Ready,
}

/// Strategies and the share lists they carry, read at one instant.
///
/// Strategy data and user balances in one snapshot always come from the
/// same refresh.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketSnapshot {
    /// Every known strategy.
    pub strategies: Vec<StrategySnapshot>,
    /// When the snapshot was taken.
    pub fetched_at: DateTime<Utc>,
    /// Loading or ready.
    pub status: DataStatus,
}

impl MarketSnapshot {
    /// An empty snapshot that has not been loaded yet.
    #[must_use]
    pub fn loading() -> Self {
        Self {
            strategies: Vec::new(),
            fetched_at: Utc::now(),
            status: DataStatus::Loading,
        }
    }
}

/// One page of audit events, newest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventPage {
    /// Events of this page, by id descending.
    pub records: Vec<EventRecord>,
    /// Total events across all pages.
    pub total: u64,
}

/// APY samples of one strategy.
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyHistory {
    /// Strategy identifier.
    pub strategy_id: u32,
    /// Samples in the requested window, in no particular order.
    pub snapshots: Vec<ApySnapshot>,
}

/// Source of strategy snapshots.
#[async_trait]
pub trait StrategySource: Send + Sync + Debug {
    /// Returns the current snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::SourceError`] if the backend is unreachable.
    async fn snapshot(&self) -> Result<MarketSnapshot, GatewayError>;
}

/// Source of per-pool TVL and APY.
#[async_trait]
pub trait PoolMetricsSource: Send + Sync + Debug {
    /// Returns metrics for the requested pools.
    ///
    /// Unknown pool ids are absent from the map; callers treat them as
    /// [`PoolMetrics::default`].
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::SourceError`] if the backend is unreachable.
    async fn pool_metrics(
        &self,
        pool_ids: &[String],
    ) -> Result<HashMap<String, PoolMetrics>, GatewayError>;

    /// Drops any cached metrics. No-op for uncached sources.
    async fn invalidate(&self) {}
}

/// Paginated source of audit events.
#[async_trait]
pub trait EventSource: Send + Sync + Debug {
    /// Returns page `page` (1-based, page 1 is newest) of `page_size`
    /// events.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::SourceError`] if the backend is unreachable.
    async fn events(&self, page: u32, page_size: u32) -> Result<EventPage, GatewayError>;
}

/// Source of strategy APY history.
#[async_trait]
pub trait HistorySource: Send + Sync + Debug {
    /// Returns samples of each requested strategy within
    /// `[from_ns, to_ns]`. Strategies without history are returned with
    /// no samples.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::SourceError`] if the backend is unreachable.
    async fn history(
        &self,
        strategy_ids: &[u32],
        from_ns: u64,
        to_ns: u64,
    ) -> Result<Vec<StrategyHistory>, GatewayError>;
}

/// The set of sources the portfolio service reads from.
#[derive(Debug, Clone)]
pub struct MarketSources {
    /// Strategy snapshots.
    pub strategies: Arc<dyn StrategySource>,
    /// Pool metrics, usually behind a [`CachedPoolMetrics`].
    pub pool_metrics: Arc<dyn PoolMetricsSource>,
    /// Audit events.
    pub events: Arc<dyn EventSource>,
    /// APY history.
    pub history: Arc<dyn HistorySource>,
}

impl MarketSources {
    /// Uses one in-memory store for every source, with pool metrics
    /// cached for `metrics_ttl`.
    #[must_use]
    pub fn from_store(store: &Arc<InMemoryMarketStore>, metrics_ttl: chrono::Duration) -> Self {
        let metrics: Arc<dyn PoolMetricsSource> = Arc::clone(store) as Arc<dyn PoolMetricsSource>;
        Self {
            strategies: Arc::clone(store) as Arc<dyn StrategySource>,
            pool_metrics: Arc::new(CachedPoolMetrics::new(
                metrics,
                TtlCache::new(metrics_ttl, SystemClock),
            )),
            events: Arc::clone(store) as Arc<dyn EventSource>,
            history: Arc::clone(store) as Arc<dyn HistorySource>,
        }
    }
}
