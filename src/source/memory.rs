//! In-memory market store.
//!
//! [`InMemoryMarketStore`] backs every source trait with process memory and
//! exposes the ingestion operations the REST layer forwards to. The
//! strategy snapshot is swapped wholesale under one lock, so a reader
//! never sees strategies from one refresh mixed with balances from the
//! next.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use tokio::sync::RwLock;

use super::{
    DataStatus, EventPage, EventSource, HistorySource, MarketSnapshot, PoolMetricsSource,
    StrategyHistory, StrategySource,
};
use crate::domain::history::HISTORY_WINDOW_DAYS;
use crate::domain::{ApySnapshot, EventRecord, PoolMetrics, StrategySnapshot};
use crate::error::GatewayError;

/// Initial contents of the store, read from a JSON seed file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MarketSeed {
    /// Strategy snapshot; absent leaves the store loading.
    #[serde(default)]
    pub strategies: Option<Vec<StrategySnapshot>>,
    /// Pool metrics by pool id.
    #[serde(default)]
    pub pool_metrics: HashMap<String, PoolMetrics>,
    /// Audit events.
    #[serde(default)]
    pub events: Vec<EventRecord>,
    /// APY history by strategy id.
    #[serde(default)]
    pub history: HashMap<u32, Vec<ApySnapshot>>,
}

impl MarketSeed {
    /// Parses a seed from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::SourceError`] if the JSON is malformed.
    pub fn from_json(text: &str) -> Result<Self, GatewayError> {
        serde_json::from_str(text)
            .map_err(|e| GatewayError::SourceError(format!("invalid market seed: {e}")))
    }
}

/// Process-local market data.
#[derive(Debug)]
pub struct InMemoryMarketStore {
    snapshot: RwLock<MarketSnapshot>,
    metrics: RwLock<HashMap<String, PoolMetrics>>,
    events: RwLock<Vec<EventRecord>>,
    history: RwLock<HashMap<u32, Vec<ApySnapshot>>>,
}

impl InMemoryMarketStore {
    /// Creates an empty store in the loading state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            snapshot: RwLock::new(MarketSnapshot::loading()),
            metrics: RwLock::new(HashMap::new()),
            events: RwLock::new(Vec::new()),
            history: RwLock::new(HashMap::new()),
        }
    }

    /// Creates a store pre-filled from `seed`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidRequest`] if the seed violates any
    /// ingestion rule.
    pub async fn from_seed(seed: MarketSeed) -> Result<Self, GatewayError> {
        let store = Self::new();
        if let Some(strategies) = seed.strategies {
            store.replace_snapshot(strategies).await?;
        }
        store.upsert_metrics(seed.pool_metrics).await;
        store.append_events(seed.events).await?;
        for (strategy_id, points) in seed.history {
            store.append_history(strategy_id, points).await;
        }
        Ok(store)
    }

    /// Replaces the strategy snapshot and marks the store ready.
    ///
    /// Returns the fetch time stamped on the new snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidRequest`] on duplicate strategy ids
    /// or if any strategy fails [`StrategySnapshot::validate`]. The
    /// previous snapshot is kept in that case.
    pub async fn replace_snapshot(
        &self,
        strategies: Vec<StrategySnapshot>,
    ) -> Result<DateTime<Utc>, GatewayError> {
        let mut ids = HashSet::with_capacity(strategies.len());
        for strategy in &strategies {
            if !ids.insert(strategy.id) {
                return Err(GatewayError::InvalidRequest(format!(
                    "duplicate strategy id {}",
                    strategy.id
                )));
            }
            strategy.validate().map_err(GatewayError::InvalidRequest)?;
        }

        let fetched_at = Utc::now();
        let count = strategies.len();
        *self.snapshot.write().await = MarketSnapshot {
            strategies,
            fetched_at,
            status: DataStatus::Ready,
        };
        tracing::info!(strategies = count, "market snapshot replaced");
        Ok(fetched_at)
    }

    /// Inserts or overwrites metrics per pool id. Returns the affected
    /// pool ids, sorted.
    pub async fn upsert_metrics(&self, metrics: HashMap<String, PoolMetrics>) -> Vec<String> {
        let mut ids: Vec<String> = metrics.keys().cloned().collect();
        ids.sort_unstable();
        self.metrics.write().await.extend(metrics);
        if !ids.is_empty() {
            tracing::debug!(pools = ids.len(), "pool metrics upserted");
        }
        ids
    }

    /// Appends events to the log.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidRequest`] if any id is already
    /// logged or repeated within the batch. Nothing is appended then.
    pub async fn append_events(&self, records: Vec<EventRecord>) -> Result<usize, GatewayError> {
        let mut log = self.events.write().await;
        let mut seen: HashSet<u64> = log.iter().map(|r| r.id).collect();
        for record in &records {
            if !seen.insert(record.id) {
                return Err(GatewayError::InvalidRequest(format!(
                    "duplicate event id {}",
                    record.id
                )));
            }
        }
        let count = records.len();
        log.extend(records);
        Ok(count)
    }

    /// Appends APY samples to a strategy's history. Returns how many were
    /// appended.
    ///
    /// Samples more than [`HISTORY_WINDOW_DAYS`] older than the newest
    /// sample of the series are dropped.
    pub async fn append_history(&self, strategy_id: u32, points: Vec<ApySnapshot>) -> usize {
        let count = points.len();
        let mut history = self.history.write().await;
        let series = history.entry(strategy_id).or_default();
        series.extend(points);

        let newest = series.iter().map(|p| p.timestamp_ns).max().unwrap_or(0);
        let cutoff = newest.saturating_sub(history_window_nanos());
        let before = series.len();
        series.retain(|p| p.timestamp_ns >= cutoff);
        let pruned = before - series.len();
        if pruned > 0 {
            tracing::debug!(strategy_id, pruned, "old history samples dropped");
        }
        count
    }
}

fn history_window_nanos() -> u64 {
    Duration::days(HISTORY_WINDOW_DAYS)
        .num_nanoseconds()
        .and_then(|n| u64::try_from(n).ok())
        .unwrap_or(u64::MAX)
}

impl Default for InMemoryMarketStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StrategySource for InMemoryMarketStore {
    async fn snapshot(&self) -> Result<MarketSnapshot, GatewayError> {
        Ok(self.snapshot.read().await.clone())
    }
}

#[async_trait]
impl PoolMetricsSource for InMemoryMarketStore {
    async fn pool_metrics(
        &self,
        pool_ids: &[String],
    ) -> Result<HashMap<String, PoolMetrics>, GatewayError> {
        let metrics = self.metrics.read().await;
        Ok(pool_ids
            .iter()
            .filter_map(|id| metrics.get(id).map(|m| (id.clone(), *m)))
            .collect())
    }
}

#[async_trait]
impl EventSource for InMemoryMarketStore {
    async fn events(&self, page: u32, page_size: u32) -> Result<EventPage, GatewayError> {
        let log = self.events.read().await;
        let mut ordered: Vec<&EventRecord> = log.iter().collect();
        ordered.sort_by(|a, b| b.id.cmp(&a.id));

        let size = usize::try_from(page_size).unwrap_or(usize::MAX);
        let skip = usize::try_from(page.max(1) - 1)
            .unwrap_or(usize::MAX)
            .saturating_mul(size);
        let records = ordered.into_iter().skip(skip).take(size).cloned().collect();
        Ok(EventPage {
            records,
            total: log.len() as u64,
        })
    }
}

#[async_trait]
impl HistorySource for InMemoryMarketStore {
    async fn history(
        &self,
        strategy_ids: &[u32],
        from_ns: u64,
        to_ns: u64,
    ) -> Result<Vec<StrategyHistory>, GatewayError> {
        let history = self.history.read().await;
        Ok(strategy_ids
            .iter()
            .map(|&strategy_id| StrategyHistory {
                strategy_id,
                snapshots: history
                    .get(&strategy_id)
                    .map(|points| {
                        points
                            .iter()
                            .filter(|p| (from_ns..=to_ns).contains(&p.timestamp_ns))
                            .copied()
                            .collect()
                    })
                    .unwrap_or_default(),
            })
            .collect())
    }
}
