//! Per-user handlers: positions, portfolio summary, profile stats.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::api::dto::{
    PortfolioSummaryResponse, PositionDto, PositionsResponse, UserStatsResponse,
};
use crate::app_state::AppState;
use crate::domain::UserPrincipal;
use crate::error::{ErrorResponse, GatewayError};

/// `GET /users/{principal}/positions`: Valued positions of a user.
///
/// # Errors
///
/// Returns [`GatewayError::InvalidPrincipal`] on a malformed principal and
/// [`GatewayError::DataNotReady`] while loading.
#[utoipa::path(
    get,
    path = "/api/v1/users/{principal}/positions",
    tag = "Portfolio",
    summary = "List a user's positions",
    description = "Resolves the strategies in which the user holds shares and values each in USD. Positions without a known price are returned with zero values and `pricing = unavailable`.",
    params(
        ("principal" = String, Path, description = "User principal in textual form"),
    ),
    responses(
        (status = 200, description = "Valued positions", body = PositionsResponse),
        (status = 400, description = "Malformed principal", body = ErrorResponse),
        (status = 503, description = "Market data still loading", body = ErrorResponse),
    )
)]
pub async fn user_positions(
    State(state): State<AppState>,
    Path(principal): Path<String>,
) -> Result<impl IntoResponse, GatewayError> {
    let user = UserPrincipal::parse(&principal)?;
    let positions = state.portfolio_service.user_positions(&user).await?;
    Ok(Json(PositionsResponse {
        user: user.to_string(),
        data: positions.into_iter().map(PositionDto::from).collect(),
    }))
}

/// `GET /users/{principal}/portfolio`: Portfolio totals of a user.
///
/// # Errors
///
/// Returns [`GatewayError::InvalidPrincipal`] on a malformed principal and
/// [`GatewayError::DataNotReady`] while loading.
#[utoipa::path(
    get,
    path = "/api/v1/users/{principal}/portfolio",
    tag = "Portfolio",
    summary = "Get a user's portfolio summary",
    description = "Folds the user's positions into total value, deposits, yield, and value-weighted APY.",
    params(
        ("principal" = String, Path, description = "User principal in textual form"),
    ),
    responses(
        (status = 200, description = "Portfolio summary", body = PortfolioSummaryResponse),
        (status = 400, description = "Malformed principal", body = ErrorResponse),
        (status = 503, description = "Market data still loading", body = ErrorResponse),
    )
)]
pub async fn portfolio_summary(
    State(state): State<AppState>,
    Path(principal): Path<String>,
) -> Result<impl IntoResponse, GatewayError> {
    let user = UserPrincipal::parse(&principal)?;
    let summary = state.portfolio_service.portfolio_summary(&user).await?;
    Ok(Json(PortfolioSummaryResponse::new(&user, summary)))
}

/// `GET /users/{principal}/stats`: Profile card figures of a user.
///
/// # Errors
///
/// Returns [`GatewayError::InvalidPrincipal`] on a malformed principal and
/// [`GatewayError::DataNotReady`] while loading.
#[utoipa::path(
    get,
    path = "/api/v1/users/{principal}/stats",
    tag = "Portfolio",
    summary = "Get a user's profile stats",
    description = "Total TVL, arithmetic-mean APY, and count of the active strategies the user holds.",
    params(
        ("principal" = String, Path, description = "User principal in textual form"),
    ),
    responses(
        (status = 200, description = "User stats", body = UserStatsResponse),
        (status = 400, description = "Malformed principal", body = ErrorResponse),
        (status = 503, description = "Market data still loading", body = ErrorResponse),
    )
)]
pub async fn user_stats(
    State(state): State<AppState>,
    Path(principal): Path<String>,
) -> Result<impl IntoResponse, GatewayError> {
    let user = UserPrincipal::parse(&principal)?;
    let stats = state.portfolio_service.user_stats(&user).await?;
    Ok(Json(UserStatsResponse::new(&user, stats)))
}

/// Per-user routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/users/{principal}/positions", get(user_positions))
        .route("/users/{principal}/portfolio", get(portfolio_summary))
        .route("/users/{principal}/stats", get(user_stats))
}
