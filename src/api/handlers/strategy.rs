//! Strategy handlers: listing, lookup, and APY history.

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::api::dto::{
    HistoryQuery, StrategyChartDto, StrategyDto, StrategyHistoryResponse, StrategyListResponse,
};
use crate::app_state::AppState;
use crate::domain::ChartPeriod;
use crate::error::{ErrorResponse, GatewayError};

/// `GET /strategies`: List active strategies.
///
/// # Errors
///
/// Returns [`GatewayError::DataNotReady`] while the market snapshot is
/// still loading.
#[utoipa::path(
    get,
    path = "/api/v1/strategies",
    tag = "Strategies",
    summary = "List active strategies",
    description = "Returns every strategy with an active pool. TVL and APY come from the active pool's metrics; `profit_level` is derived from TVL.",
    responses(
        (status = 200, description = "Active strategies", body = StrategyListResponse),
        (status = 503, description = "Market data still loading", body = ErrorResponse),
    )
)]
pub async fn list_strategies(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, GatewayError> {
    let listings = state.portfolio_service.list_strategies().await?;
    Ok(Json(StrategyListResponse {
        data: listings.into_iter().map(StrategyDto::from).collect(),
    }))
}

/// `GET /strategies/{id}`: Get one strategy, active or not.
///
/// # Errors
///
/// Returns [`GatewayError::StrategyNotFound`] if the id is unknown.
#[utoipa::path(
    get,
    path = "/api/v1/strategies/{id}",
    tag = "Strategies",
    summary = "Get strategy details",
    description = "Returns a single strategy including inactive ones.",
    params(
        ("id" = u32, Path, description = "Strategy id"),
    ),
    responses(
        (status = 200, description = "Strategy details", body = StrategyDto),
        (status = 404, description = "Strategy not found", body = ErrorResponse),
        (status = 503, description = "Market data still loading", body = ErrorResponse),
    )
)]
pub async fn get_strategy(
    State(state): State<AppState>,
    Path(id): Path<u32>,
) -> Result<impl IntoResponse, GatewayError> {
    let listing = state.portfolio_service.get_strategy(id).await?;
    Ok(Json(StrategyDto::from(listing)))
}

/// `GET /strategies/history`: APY chart series.
///
/// # Errors
///
/// Returns [`GatewayError::InvalidRequest`] on malformed ids and
/// [`GatewayError::InvalidPeriod`] on an unknown period.
#[utoipa::path(
    get,
    path = "/api/v1/strategies/history",
    tag = "Strategies",
    summary = "Strategy APY history",
    description = "Returns chart points per strategy over the last 30 days, sampled hourly for `24h` and daily for `1w` and `1m`.",
    params(HistoryQuery),
    responses(
        (status = 200, description = "Chart series", body = StrategyHistoryResponse),
        (status = 400, description = "Invalid ids or period", body = ErrorResponse),
    )
)]
pub async fn strategy_history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Result<impl IntoResponse, GatewayError> {
    let ids = parse_ids(&query.ids)?;
    let period: ChartPeriod = query.period.as_deref().unwrap_or("24h").parse()?;

    let series = state
        .portfolio_service
        .strategy_history(&ids, period)
        .await?;
    Ok(Json(StrategyHistoryResponse {
        period: period.to_string(),
        data: series.into_iter().map(StrategyChartDto::from).collect(),
    }))
}

/// Strategy routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/strategies", get(list_strategies))
        .route("/strategies/history", get(strategy_history))
        .route("/strategies/{id}", get(get_strategy))
}

/// Parses a comma-separated id list, skipping blanks and duplicates.
///
/// # Errors
///
/// Returns [`GatewayError::InvalidRequest`] if an entry is not a `u32` or
/// the list is empty.
fn parse_ids(raw: &str) -> Result<Vec<u32>, GatewayError> {
    let mut ids = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let id: u32 = part
            .parse()
            .map_err(|_| GatewayError::InvalidRequest(format!("invalid strategy id: {part}")))?;
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    if ids.is_empty() {
        return Err(GatewayError::InvalidRequest(
            "at least one strategy id is required".to_string(),
        ));
    }
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_ids_accepts_spaces_and_dedups() {
        let ids = parse_ids(" 3, 1,3 ,,2").ok();
        assert_eq!(ids, Some(vec![3, 1, 2]));
    }

    #[test]
    fn parse_ids_rejects_garbage_and_empty() {
        assert!(matches!(parse_ids("1,x"), Err(GatewayError::InvalidRequest(_))));
        assert!(matches!(parse_ids(" , "), Err(GatewayError::InvalidRequest(_))));
    }
}
