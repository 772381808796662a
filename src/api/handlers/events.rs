//! Activity feed handler.

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::api::dto::{
    DEFAULT_PER_PAGE, EventGroupDto, EventGroupListResponse, EventQuery, PaginationMeta,
    PaginationParams,
};
use crate::app_state::AppState;
use crate::domain::UserPrincipal;
use crate::error::{ErrorResponse, GatewayError};

/// `GET /events`: Correlated event groups, newest first.
///
/// # Errors
///
/// Returns [`GatewayError::InvalidPrincipal`] if `user` is malformed.
#[utoipa::path(
    get,
    path = "/api/v1/events",
    tag = "Events",
    summary = "List correlated event groups",
    description = "Fetches one page of audit events (newest first), optionally keeps only those of `user`, and groups them by correlation id. Pagination counts underlying events, not groups. The `user` filter applies within the fetched page, so `total` and `total_pages` count every user's events.",
    params(EventQuery),
    responses(
        (status = 200, description = "Event groups", body = EventGroupListResponse),
        (status = 400, description = "Malformed principal", body = ErrorResponse),
    )
)]
pub async fn list_event_groups(
    State(state): State<AppState>,
    Query(query): Query<EventQuery>,
) -> Result<impl IntoResponse, GatewayError> {
    let user = query
        .user
        .as_deref()
        .filter(|u| !u.trim().is_empty())
        .map(UserPrincipal::parse)
        .transpose()?;

    let params = PaginationParams {
        page: query.page.unwrap_or(1),
        per_page: query.per_page.unwrap_or(DEFAULT_PER_PAGE),
    }
    .clamped(state.portfolio_service.max_page_size());

    let page = state
        .portfolio_service
        .event_groups(user.as_ref(), params.page, params.per_page)
        .await?;

    Ok(Json(EventGroupListResponse {
        pagination: PaginationMeta::new(page.page, page.per_page, page.total_events),
        data: page.groups.into_iter().map(EventGroupDto::from).collect(),
    }))
}

/// Event routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/events", get(list_event_groups))
}
