//! Live feed events reflecting market data changes.
//!
//! Every ingestion emits a [`FeedEvent`] through the [`super::EventBus`].
//! Events are broadcast to WebSocket subscribers, filtered per principal.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{EventRecord, UserPrincipal};

/// Event emitted after every ingestion into the market store.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum FeedEvent {
    /// The strategy snapshot was replaced.
    SnapshotRefreshed {
        /// Number of strategies in the new snapshot.
        strategy_count: usize,
        /// Fetch time of the new snapshot.
        fetched_at: DateTime<Utc>,
    },

    /// Pool metrics were upserted.
    PoolMetricsUpdated {
        /// Pools whose metrics changed.
        pool_ids: Vec<String>,
        /// Ingestion timestamp.
        timestamp: DateTime<Utc>,
    },

    /// A vault audit event was recorded.
    EventRecorded {
        /// The recorded event.
        record: EventRecord,
    },

    /// APY history points were appended to a strategy.
    HistoryAppended {
        /// Strategy identifier.
        strategy_id: u32,
        /// Number of points appended.
        points: usize,
        /// Ingestion timestamp.
        timestamp: DateTime<Utc>,
    },
}

impl FeedEvent {
    /// Returns the principal the event concerns, if it is user-scoped.
    ///
    /// Market-wide events return `None` and go to every subscriber.
    #[must_use]
    pub fn user(&self) -> Option<&UserPrincipal> {
        match self {
            Self::EventRecorded { record } => record.user.as_ref(),
            Self::SnapshotRefreshed { .. }
            | Self::PoolMetricsUpdated { .. }
            | Self::HistoryAppended { .. } => None,
        }
    }

    /// Returns the event type as a static string slice.
    #[must_use]
    pub const fn event_type_str(&self) -> &'static str {
        match self {
            Self::SnapshotRefreshed { .. } => "snapshot_refreshed",
            Self::PoolMetricsUpdated { .. } => "pool_metrics_updated",
            Self::EventRecorded { .. } => "event_recorded",
            Self::HistoryAppended { .. } => "history_appended",
        }
    }
}
