//! Ingestion handlers: the write side fed by vault indexers.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{post, put};
use axum::{Json, Router};

use crate::api::dto::{
    AppendHistoryRequest, IngestResponse, PoolMetricsRequest, RecordEventsRequest,
    ReplaceSnapshotRequest,
};
use crate::app_state::AppState;
use crate::error::{ErrorResponse, GatewayError};

/// `PUT /market/snapshot`: Replace the strategy snapshot.
///
/// # Errors
///
/// Returns [`GatewayError::InvalidRequest`] on duplicate strategy ids,
/// duplicate principals, or a dangling `current_pool`.
#[utoipa::path(
    put,
    path = "/api/v1/market/snapshot",
    tag = "Ingestion",
    summary = "Replace the strategy snapshot",
    description = "Swaps in a complete set of strategies with their share lists. Readers never see a mix of old and new data.",
    request_body = ReplaceSnapshotRequest,
    responses(
        (status = 200, description = "Snapshot replaced", body = IngestResponse),
        (status = 400, description = "Malformed snapshot", body = ErrorResponse),
    )
)]
pub async fn replace_snapshot(
    State(state): State<AppState>,
    Json(req): Json<ReplaceSnapshotRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    let accepted = state
        .portfolio_service
        .replace_snapshot(req.strategies)
        .await?;
    Ok(Json(IngestResponse::accepted(accepted)))
}

/// `PUT /market/pool-metrics`: Upsert pool TVL/APY.
#[utoipa::path(
    put,
    path = "/api/v1/market/pool-metrics",
    tag = "Ingestion",
    summary = "Upsert pool metrics",
    description = "Inserts or overwrites TVL and APY per pool id and drops cached metrics.",
    request_body = PoolMetricsRequest,
    responses(
        (status = 200, description = "Metrics upserted", body = IngestResponse),
    )
)]
pub async fn upsert_pool_metrics(
    State(state): State<AppState>,
    Json(req): Json<PoolMetricsRequest>,
) -> impl IntoResponse {
    let pool_ids = state
        .portfolio_service
        .upsert_pool_metrics(req.metrics)
        .await;
    let mut response = IngestResponse::accepted(pool_ids.len());
    response.pool_ids = pool_ids;
    Json(response)
}

/// `POST /events`: Append audit events.
///
/// # Errors
///
/// Returns [`GatewayError::InvalidRequest`] on duplicate event ids.
#[utoipa::path(
    post,
    path = "/api/v1/events",
    tag = "Ingestion",
    summary = "Append audit events",
    description = "Appends events to the log and broadcasts each one to WebSocket subscribers of its user.",
    request_body = RecordEventsRequest,
    responses(
        (status = 201, description = "Events appended", body = IngestResponse),
        (status = 400, description = "Duplicate event id", body = ErrorResponse),
    )
)]
pub async fn record_events(
    State(state): State<AppState>,
    Json(req): Json<RecordEventsRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    let accepted = state.portfolio_service.record_events(req.events).await?;
    Ok((StatusCode::CREATED, Json(IngestResponse::accepted(accepted))))
}

/// `POST /strategies/{id}/history`: Append APY samples.
#[utoipa::path(
    post,
    path = "/api/v1/strategies/{id}/history",
    tag = "Ingestion",
    summary = "Append strategy APY history",
    description = "Appends APY samples to a strategy's history.",
    params(
        ("id" = u32, Path, description = "Strategy id"),
    ),
    request_body = AppendHistoryRequest,
    responses(
        (status = 201, description = "Samples appended", body = IngestResponse),
    )
)]
pub async fn append_history(
    State(state): State<AppState>,
    Path(id): Path<u32>,
    Json(req): Json<AppendHistoryRequest>,
) -> impl IntoResponse {
    let accepted = state
        .portfolio_service
        .append_history(id, req.points)
        .await;
    (StatusCode::CREATED, Json(IngestResponse::accepted(accepted)))
}

/// Ingestion routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/market/snapshot", put(replace_snapshot))
        .route("/market/pool-metrics", put(upsert_pool_metrics))
        .route("/events", post(record_events))
        .route("/strategies/{id}/history", post(append_history))
}
