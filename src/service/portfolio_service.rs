//! Portfolio service: reads market data, runs the portfolio core, and
//! forwards ingestion to the store.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Duration, Utc};

use crate::domain::history::HISTORY_WINDOW_DAYS;
use crate::domain::{
    ApySnapshot, ChartPeriod, EventBus, EventGroup, EventRecord, FeedEvent, PoolMetrics,
    PortfolioSummary, ProfitLevel, StrategyChartSeries, StrategySnapshot, UserPosition,
    UserPrincipal, UserStats, chart_series, filter_by_user, group_events, resolve_positions,
    value_positions,
};
use crate::error::GatewayError;
use crate::source::{DataStatus, InMemoryMarketStore, MarketSources};

/// A strategy as shown in listings.
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyListing {
    /// Strategy with TVL/APY taken from its active pool's metrics.
    pub strategy: StrategySnapshot,
    /// Badge derived from the enriched TVL.
    pub profit_level: ProfitLevel,
}

impl From<StrategySnapshot> for StrategyListing {
    fn from(strategy: StrategySnapshot) -> Self {
        Self {
            profit_level: ProfitLevel::from_tvl(strategy.tvl),
            strategy,
        }
    }
}

/// One page of correlated event groups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventGroupPage {
    /// Groups built from the page's events.
    pub groups: Vec<EventGroup>,
    /// Page number actually served (1-based).
    pub page: u32,
    /// Page size actually served.
    pub per_page: u32,
    /// Total events across all pages, before user filtering. With a user
    /// filter this overstates that user's feed.
    pub total_events: u64,
}

/// Orchestration layer for every portfolio read and ingestion.
///
/// Reads take one [`crate::source::MarketSnapshot`] per call and run the
/// pure domain functions on it. Ingestion writes through the
/// [`InMemoryMarketStore`] and publishes a [`FeedEvent`] per change.
#[derive(Debug, Clone)]
pub struct PortfolioService {
    sources: MarketSources,
    store: Arc<InMemoryMarketStore>,
    event_bus: EventBus,
    max_page_size: u32,
}

impl PortfolioService {
    /// Creates a new `PortfolioService`.
    #[must_use]
    pub fn new(
        sources: MarketSources,
        store: Arc<InMemoryMarketStore>,
        event_bus: EventBus,
        max_page_size: u32,
    ) -> Self {
        Self {
            sources,
            store,
            event_bus,
            max_page_size: max_page_size.max(1),
        }
    }

    /// Returns a reference to the inner [`EventBus`].
    #[must_use]
    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    /// Largest page size [`Self::event_groups`] will serve.
    #[must_use]
    pub const fn max_page_size(&self) -> u32 {
        self.max_page_size
    }

    /// Every strategy of the current snapshot, with TVL/APY enriched from
    /// pool metrics.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::DataNotReady`] while no snapshot has been
    /// ingested, or a source error.
    async fn enriched_strategies(&self) -> Result<Vec<StrategySnapshot>, GatewayError> {
        let snapshot = self.sources.strategies.snapshot().await?;
        if snapshot.status == DataStatus::Loading {
            return Err(GatewayError::DataNotReady);
        }

        let mut pool_ids: Vec<String> = snapshot
            .strategies
            .iter()
            .filter_map(|s| s.current_pool.clone())
            .collect();
        pool_ids.sort_unstable();
        pool_ids.dedup();

        let metrics = if pool_ids.is_empty() {
            HashMap::new()
        } else {
            self.sources.pool_metrics.pool_metrics(&pool_ids).await?
        };

        let mut strategies = snapshot.strategies;
        for strategy in &mut strategies {
            strategy.apply_metrics(&metrics);
        }
        Ok(strategies)
    }

    /// Lists active strategies with their profit level.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::DataNotReady`] while loading, or a source
    /// error.
    pub async fn list_strategies(&self) -> Result<Vec<StrategyListing>, GatewayError> {
        let strategies = self.enriched_strategies().await?;
        Ok(strategies
            .into_iter()
            .filter(StrategySnapshot::is_active)
            .map(StrategyListing::from)
            .collect())
    }

    /// Returns one strategy, active or not.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::StrategyNotFound`] if no strategy has `id`,
    /// [`GatewayError::DataNotReady`] while loading, or a source error.
    pub async fn get_strategy(&self, id: u32) -> Result<StrategyListing, GatewayError> {
        self.enriched_strategies()
            .await?
            .into_iter()
            .find(|s| s.id == id)
            .map(StrategyListing::from)
            .ok_or(GatewayError::StrategyNotFound(id))
    }

    /// Values every position `user` holds.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::DataNotReady`] while loading, or a source
    /// error.
    pub async fn user_positions(
        &self,
        user: &UserPrincipal,
    ) -> Result<Vec<UserPosition>, GatewayError> {
        let strategies = self.enriched_strategies().await?;
        Ok(value_positions(&strategies, user))
    }

    /// Aggregates `user`'s positions into portfolio totals.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::DataNotReady`] while loading, or a source
    /// error.
    pub async fn portfolio_summary(
        &self,
        user: &UserPrincipal,
    ) -> Result<PortfolioSummary, GatewayError> {
        let positions = self.user_positions(user).await?;
        let summary = PortfolioSummary::aggregate(&positions);
        tracing::info!(
            %user,
            positions = summary.position_count,
            unpriced = summary.unpriced_positions,
            value_usd = summary.portfolio_value_usd,
            "portfolio aggregated"
        );
        Ok(summary)
    }

    /// Profile card figures for `user`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::DataNotReady`] while loading, or a source
    /// error.
    pub async fn user_stats(&self, user: &UserPrincipal) -> Result<UserStats, GatewayError> {
        let strategies = self.enriched_strategies().await?;
        let held = resolve_positions(&strategies, user);
        Ok(UserStats::compute(&held, user))
    }

    /// Groups one page of events by correlation id.
    ///
    /// With `user` set, only that user's events are grouped. `per_page`
    /// is clamped to `1..=max_page_size`.
    ///
    /// # Errors
    ///
    /// Returns a source error if the event source fails.
    pub async fn event_groups(
        &self,
        user: Option<&UserPrincipal>,
        page: u32,
        per_page: u32,
    ) -> Result<EventGroupPage, GatewayError> {
        let page = page.max(1);
        let per_page = per_page.clamp(1, self.max_page_size);
        let fetched = self.sources.events.events(page, per_page).await?;

        let records = match user {
            Some(user) => filter_by_user(fetched.records, user),
            None => fetched.records,
        };
        let groups = group_events(records);
        tracing::debug!(page, per_page, groups = groups.len(), "event groups built");

        Ok(EventGroupPage {
            groups,
            page,
            per_page,
            total_events: fetched.total,
        })
    }

    /// Builds APY chart series for the requested strategies.
    ///
    /// The last thirty days are fetched whatever the period; the period
    /// only controls sampling.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Internal`] if the clock is outside the
    /// nanosecond range, or a source error.
    pub async fn strategy_history(
        &self,
        strategy_ids: &[u32],
        period: ChartPeriod,
    ) -> Result<Vec<StrategyChartSeries>, GatewayError> {
        let now = Utc::now();
        let to_ns = nanos(now)?;
        let from_ns = nanos(now - Duration::days(HISTORY_WINDOW_DAYS))?;

        let histories = self
            .sources
            .history
            .history(strategy_ids, from_ns, to_ns)
            .await?;
        Ok(histories
            .into_iter()
            .map(|h| StrategyChartSeries {
                strategy_id: h.strategy_id,
                data: chart_series(h.snapshots, period),
            })
            .collect())
    }

    /// Replaces the strategy snapshot and notifies subscribers.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidRequest`] if the snapshot is
    /// malformed.
    pub async fn replace_snapshot(
        &self,
        strategies: Vec<StrategySnapshot>,
    ) -> Result<usize, GatewayError> {
        let strategy_count = strategies.len();
        let fetched_at = self.store.replace_snapshot(strategies).await?;
        let _ = self.event_bus.publish(FeedEvent::SnapshotRefreshed {
            strategy_count,
            fetched_at,
        });
        Ok(strategy_count)
    }

    /// Upserts pool metrics, drops cached metrics, and notifies
    /// subscribers. Returns the affected pool ids.
    pub async fn upsert_pool_metrics(&self, metrics: HashMap<String, PoolMetrics>) -> Vec<String> {
        let pool_ids = self.store.upsert_metrics(metrics).await;
        self.sources.pool_metrics.invalidate().await;
        if !pool_ids.is_empty() {
            let _ = self.event_bus.publish(FeedEvent::PoolMetricsUpdated {
                pool_ids: pool_ids.clone(),
                timestamp: Utc::now(),
            });
        }
        pool_ids
    }

    /// Appends audit events and publishes each one.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidRequest`] on duplicate event ids.
    pub async fn record_events(&self, records: Vec<EventRecord>) -> Result<usize, GatewayError> {
        let published = records.clone();
        let count = self.store.append_events(records).await?;
        for record in published {
            tracing::debug!(id = record.id, kind = %record.kind, "event recorded");
            let _ = self.event_bus.publish(FeedEvent::EventRecorded { record });
        }
        Ok(count)
    }

    /// Appends APY samples to a strategy's history.
    pub async fn append_history(&self, strategy_id: u32, points: Vec<ApySnapshot>) -> usize {
        let appended = self.store.append_history(strategy_id, points).await;
        let _ = self.event_bus.publish(FeedEvent::HistoryAppended {
            strategy_id,
            points: appended,
            timestamp: Utc::now(),
        });
        appended
    }
}

fn nanos(at: chrono::DateTime<Utc>) -> Result<u64, GatewayError> {
    at.timestamp_nanos_opt()
        .and_then(|n| u64::try_from(n).ok())
        .ok_or_else(|| GatewayError::Internal(format!("timestamp out of range: {at}")))
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::event_record::tests::record;
    use crate::domain::strategy::tests::{principal, strategy};
    use crate::domain::{EventKind, Operation, Outcome, Pricing};

    const EPS: f64 = 1e-9;

    fn make_service() -> PortfolioService {
        let store = Arc::new(InMemoryMarketStore::new());
        let sources = MarketSources::from_store(&store, Duration::minutes(5));
        PortfolioService::new(sources, store, EventBus::new(64), 50)
    }

    fn held_strategies() -> Vec<StrategySnapshot> {
        let user = principal("zv5zm-zyhmm");
        let mut a = strategy(1, 1000);
        a.user_shares.push((user.clone(), 100));
        a.initial_deposit.push((user, 8_000_000));
        let mut inactive = strategy(2, 500);
        inactive.current_pool = None;
        inactive.tvl = 50_000_000;
        vec![a, inactive]
    }

    #[tokio::test]
    async fn reads_fail_while_loading() {
        let svc = make_service();
        let result = svc.portfolio_summary(&principal("abc")).await;
        assert!(matches!(result, Err(GatewayError::DataNotReady)));
        assert!(matches!(
            svc.list_strategies().await,
            Err(GatewayError::DataNotReady)
        ));
    }

    #[tokio::test]
    async fn summary_uses_pool_metrics() {
        let svc = make_service();
        let Ok(_) = svc.replace_snapshot(held_strategies()).await else {
            panic!("snapshot should ingest");
        };
        svc.upsert_pool_metrics(HashMap::from([(
            "pool-1".to_string(),
            PoolMetrics {
                tvl: 100_000_000,
                apy: 10.0,
            },
        )]))
        .await;

        let Ok(summary) = svc.portfolio_summary(&principal("ZV5ZM-ZYHMM")).await else {
            panic!("summary failed");
        };
        assert_eq!(summary.position_count, 1);
        assert!((summary.portfolio_value_usd - 0.10).abs() < EPS);
        assert!((summary.total_yield_usd - 0.02).abs() < EPS);
        assert!((summary.current_apy - 10.0).abs() < EPS);
        assert_eq!(summary.pricing, Pricing::Priced);
    }

    #[tokio::test]
    async fn missing_pool_metrics_leave_summary_unpriced() {
        let svc = make_service();
        let mut strategies = held_strategies();
        if let Some(a) = strategies.first_mut() {
            a.tvl = 100_000_000;
            a.apy = 10.0;
        }
        let Ok(_) = svc.replace_snapshot(strategies).await else {
            panic!("snapshot should ingest");
        };

        let Ok(summary) = svc.portfolio_summary(&principal("zv5zm-zyhmm")).await else {
            panic!("summary failed");
        };
        assert_eq!(summary.position_count, 1);
        assert!(summary.portfolio_value_usd.abs() < EPS);
        assert_eq!(summary.unpriced_positions, 1);
        assert_eq!(summary.pricing, Pricing::Unavailable);

        svc.upsert_pool_metrics(HashMap::from([(
            "pool-1".to_string(),
            PoolMetrics {
                tvl: 100_000_000,
                apy: 10.0,
            },
        )]))
        .await;
        let Ok(summary) = svc.portfolio_summary(&principal("zv5zm-zyhmm")).await else {
            panic!("summary failed");
        };
        assert_eq!(summary.unpriced_positions, 0);
        assert_eq!(summary.pricing, Pricing::Priced);
    }

    #[tokio::test]
    async fn listing_hides_inactive_but_lookup_finds_it() {
        let svc = make_service();
        let Ok(_) = svc.replace_snapshot(held_strategies()).await else {
            panic!("snapshot should ingest");
        };
        let Ok(listed) = svc.list_strategies().await else {
            panic!("listing failed");
        };
        assert_eq!(listed.len(), 1);
        assert_eq!(listed.first().map(|l| l.profit_level), Some(ProfitLevel::High));

        let Ok(inactive) = svc.get_strategy(2).await else {
            panic!("inactive strategy should be found");
        };
        assert_eq!(inactive.strategy.tvl, 50_000_000);
        assert!(matches!(
            svc.get_strategy(99).await,
            Err(GatewayError::StrategyNotFound(99))
        ));
    }

    #[tokio::test]
    async fn event_groups_filter_by_user_and_clamp_page_size() {
        let svc = make_service();
        let me = principal("me");
        let started = EventKind::new(Operation::StrategyDeposit, Outcome::Started);
        let failed = EventKind::new(Operation::StrategyDeposit, Outcome::Failed);

        let mut a = record(1, "c1", started);
        a.user = Some(me.clone());
        let mut b = record(2, "c1", failed);
        b.user = Some(me.clone());
        let mut c = record(3, "c2", started);
        c.user = Some(principal("other"));

        let Ok(3) = svc.record_events(vec![a, b, c]).await else {
            panic!("events should ingest");
        };

        let Ok(page) = svc.event_groups(Some(&me), 1, 10_000).await else {
            panic!("event groups failed");
        };
        assert_eq!(page.per_page, 50);
        assert_eq!(page.total_events, 3);
        assert_eq!(page.groups.len(), 1);
        assert!(page.groups.first().is_some_and(|g| g.has_failed_event));

        let Ok(all) = svc.event_groups(None, 0, 20).await else {
            panic!("event groups failed");
        };
        assert_eq!(all.page, 1);
        assert_eq!(all.groups.len(), 2);
    }

    #[tokio::test]
    async fn ingestion_publishes_feed_events() {
        let svc = make_service();
        let mut rx = svc.event_bus().subscribe();
        let Ok(_) = svc.replace_snapshot(vec![]).await else {
            panic!("snapshot should ingest");
        };
        let Ok(FeedEvent::SnapshotRefreshed { strategy_count, .. }) = rx.recv().await else {
            panic!("expected snapshot event");
        };
        assert_eq!(strategy_count, 0);
    }

    #[tokio::test]
    async fn history_series_for_recent_points() {
        let svc = make_service();
        let Some(now_ns) = Utc::now()
            .timestamp_nanos_opt()
            .and_then(|n| u64::try_from(n).ok())
        else {
            panic!("clock in range");
        };
        let points = (0..48u64)
            .map(|h| ApySnapshot {
                timestamp_ns: now_ns - (h + 1) * 3_600_000_000_000,
                apy: 5.0,
            })
            .collect();
        assert_eq!(svc.append_history(1, points).await, 48);

        let Ok(series) = svc.strategy_history(&[1, 2], ChartPeriod::Week).await else {
            panic!("history failed");
        };
        assert_eq!(series.len(), 2);
        assert_eq!(series.first().map(|s| s.data.len()), Some(2));
        assert_eq!(series.get(1).map(|s| s.data.is_empty()), Some(true));
    }
}
