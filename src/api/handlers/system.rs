//! System endpoints: health check and event kind catalog.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

use crate::api::dto::EventKindInfo;
use crate::app_state::AppState;
use crate::domain::EventKind;

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    status: String,
    timestamp: String,
    version: String,
}

/// `GET /health`: Service health status.
#[utoipa::path(
    get,
    path = "/health",
    tag = "System",
    summary = "Health check",
    description = "Returns service health status, version, and current timestamp.",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
    )
)]
pub async fn health_handler() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy".to_string(),
            timestamp: Utc::now().to_rfc3339(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }),
    )
}

/// `GET /config/event-kinds`: List every audit event kind.
#[utoipa::path(
    get,
    path = "/config/event-kinds",
    tag = "System",
    summary = "List event kinds",
    description = "Returns the closed set of event kinds: six operations, each started, completed, or failed.",
    responses(
        (status = 200, description = "Event kind catalog", body = Vec<EventKindInfo>),
    )
)]
pub async fn event_kinds_handler() -> impl IntoResponse {
    let kinds: Vec<EventKindInfo> = EventKind::all().map(EventKindInfo::from).collect();
    (StatusCode::OK, Json(kinds))
}

/// System routes mounted at the root level (not under /api/v1).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_handler))
        .route("/config/event-kinds", get(event_kinds_handler))
}
