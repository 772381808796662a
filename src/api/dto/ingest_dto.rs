//! Ingestion DTOs.
//!
//! Request bodies carry domain types directly; amounts are JSON integers.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{ApySnapshot, EventRecord, PoolMetrics, StrategySnapshot};

/// Request body for `PUT /market/snapshot`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ReplaceSnapshotRequest {
    /// Every strategy; replaces the previous snapshot wholesale.
    #[schema(value_type = Vec<Object>)]
    pub strategies: Vec<StrategySnapshot>,
}

/// Request body for `PUT /market/pool-metrics`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct PoolMetricsRequest {
    /// Metrics keyed by pool id.
    #[schema(value_type = Object)]
    pub metrics: HashMap<String, PoolMetrics>,
}

/// Request body for `POST /events`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RecordEventsRequest {
    /// Events to append.
    #[schema(value_type = Vec<Object>)]
    pub events: Vec<EventRecord>,
}

/// Request body for `POST /strategies/{id}/history`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct AppendHistoryRequest {
    /// APY samples to append.
    #[schema(value_type = Vec<Object>)]
    pub points: Vec<ApySnapshot>,
}

/// Response for every ingestion endpoint.
#[derive(Debug, Serialize, ToSchema)]
pub struct IngestResponse {
    /// Number of items accepted.
    pub accepted: usize,
    /// Pool ids touched, for metrics ingestion.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub pool_ids: Vec<String>,
    /// Server time of ingestion.
    pub ingested_at: DateTime<Utc>,
}

impl IngestResponse {
    /// Acknowledges `accepted` items.
    #[must_use]
    pub fn accepted(accepted: usize) -> Self {
        Self {
            accepted,
            pool_ids: Vec::new(),
            ingested_at: Utc::now(),
        }
    }
}
