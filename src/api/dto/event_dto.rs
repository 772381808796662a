//! Activity feed DTOs.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::common_dto::PaginationMeta;
use crate::domain::{EventDetails, EventGroup, EventKind, EventRecord};

/// Query parameters for `GET /events`.
#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct EventQuery {
    /// Only group events initiated by this principal. Filters within the
    /// fetched page; pagination totals stay unfiltered.
    #[serde(default)]
    pub user: Option<String>,
    /// Page number (1-indexed). Defaults to 1.
    #[serde(default)]
    pub page: Option<u32>,
    /// Events per page. Defaults to 20.
    #[serde(default)]
    pub per_page: Option<u32>,
}

/// Operation payload with amounts as strings.
#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct EventDetailsDto {
    /// Strategy id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy_id: Option<u32>,
    /// Pool id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pool_id: Option<String>,
    /// Token0 amount.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount0: Option<String>,
    /// Token1 amount.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount1: Option<String>,
    /// Shares moved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shares: Option<String>,
    /// Total shares.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_shares: Option<String>,
    /// Swap input token.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_in: Option<String>,
    /// Swap output token.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_out: Option<String>,
    /// Swap input amount.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount_in: Option<String>,
    /// Swap output amount.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount_out: Option<String>,
    /// Rebalance source pool.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_pool_id: Option<String>,
    /// Rebalance target pool.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_pool_id: Option<String>,
    /// Error code of a failed operation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<u32>,
    /// Error message of a failed operation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl From<EventDetails> for EventDetailsDto {
    fn from(d: EventDetails) -> Self {
        let amount = |v: Option<u128>| v.map(|n| n.to_string());
        Self {
            strategy_id: d.strategy_id,
            pool_id: d.pool_id,
            amount0: amount(d.amount0),
            amount1: amount(d.amount1),
            shares: amount(d.shares),
            total_shares: amount(d.total_shares),
            token_in: d.token_in,
            token_out: d.token_out,
            amount_in: amount(d.amount_in),
            amount_out: amount(d.amount_out),
            previous_pool_id: d.previous_pool_id,
            new_pool_id: d.new_pool_id,
            error_code: d.error.as_ref().and_then(|e| e.code),
            error_message: d.error.map(|e| e.message),
        }
    }
}

/// One audit event.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct EventDto {
    /// Event id.
    pub id: u64,
    /// Nanoseconds since the epoch (string-encoded).
    pub timestamp_ns: String,
    /// Canonical kind, e.g. `StrategyDepositCompleted`.
    pub kind: String,
    /// Human-readable kind.
    pub title: String,
    /// Correlation key.
    pub correlation_id: String,
    /// Initiating principal.
    pub user: Option<String>,
    /// Whether the event is a failure.
    pub failed: bool,
    /// One-line description.
    pub summary: String,
    /// Operation payload.
    pub details: EventDetailsDto,
}

impl From<EventRecord> for EventDto {
    fn from(record: EventRecord) -> Self {
        let summary = record.summary();
        Self {
            id: record.id,
            timestamp_ns: record.timestamp_ns.to_string(),
            kind: record.kind.canonical_name(),
            title: record.kind.title(),
            correlation_id: record.correlation_id,
            user: record.user.map(String::from),
            failed: record.kind.is_failure(),
            summary,
            details: EventDetailsDto::from(record.details),
        }
    }
}

/// Events of one logical operation.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct EventGroupDto {
    /// Correlation key.
    pub correlation_id: String,
    /// Title of the newest event.
    pub label: String,
    /// Summary of the newest event.
    pub summary: String,
    /// Whether any event failed.
    pub has_failed_event: bool,
    /// Id of the newest event.
    pub first_event_id: u64,
    /// Events by id descending.
    pub events: Vec<EventDto>,
}

impl From<EventGroup> for EventGroupDto {
    fn from(group: EventGroup) -> Self {
        Self {
            correlation_id: group.correlation_id,
            label: group.label,
            summary: group.summary,
            has_failed_event: group.has_failed_event,
            first_event_id: group.first_event.id,
            events: group.events.into_iter().map(EventDto::from).collect(),
        }
    }
}

/// Response for `GET /events`.
#[derive(Debug, Serialize, ToSchema)]
pub struct EventGroupListResponse {
    /// Groups in the page.
    pub data: Vec<EventGroupDto>,
    /// Pagination over the underlying events.
    pub pagination: PaginationMeta,
}

/// Catalog entry for `GET /config/event-kinds`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct EventKindInfo {
    /// Canonical tag.
    pub kind: String,
    /// Human-readable title.
    pub title: String,
    /// Whether the kind marks a failure.
    pub failure: bool,
}

impl From<EventKind> for EventKindInfo {
    fn from(kind: EventKind) -> Self {
        Self {
            kind: kind.canonical_name(),
            title: kind.title(),
            failure: kind.is_failure(),
        }
    }
}
