//! Per-user portfolio DTOs.

use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::{PortfolioSummary, Pricing, UserPosition, UserPrincipal, UserStats};

/// One valued position.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PositionDto {
    /// Strategy identifier.
    pub strategy_id: u32,
    /// Strategy display name.
    pub strategy_name: String,
    /// Owned fraction of the strategy, in `[0, 1]`.
    pub share_fraction: f64,
    /// Current value in USD.
    pub current_value_usd: f64,
    /// Initial deposit in USD.
    pub initial_value_usd: f64,
    /// Current minus initial value, in USD.
    pub yield_usd: f64,
    /// Strategy APY in percent.
    pub apy: f64,
    /// `unavailable` when the USD figures are substituted zeros.
    pub pricing: Pricing,
}

impl From<UserPosition> for PositionDto {
    fn from(p: UserPosition) -> Self {
        Self {
            strategy_id: p.strategy_id,
            strategy_name: p.strategy_name,
            share_fraction: p.share_fraction,
            current_value_usd: p.current_value_usd,
            initial_value_usd: p.initial_value_usd,
            yield_usd: p.yield_usd,
            apy: p.apy,
            pricing: p.pricing,
        }
    }
}

/// Response for `GET /users/{principal}/positions`.
#[derive(Debug, Serialize, ToSchema)]
pub struct PositionsResponse {
    /// Canonical principal.
    pub user: String,
    /// Positions with non-zero shares.
    pub data: Vec<PositionDto>,
}

/// Response for `GET /users/{principal}/portfolio`.
#[derive(Debug, Serialize, ToSchema)]
pub struct PortfolioSummaryResponse {
    /// Canonical principal.
    pub user: String,
    /// Sum of current values, in USD.
    pub portfolio_value_usd: f64,
    /// Sum of initial deposits, in USD.
    pub deposited_usd: f64,
    /// Value-weighted APY in percent.
    pub current_apy: f64,
    /// Sum of yields, in USD.
    pub total_yield_usd: f64,
    /// Number of positions.
    pub position_count: usize,
    /// Positions valued without a price.
    pub unpriced_positions: usize,
    /// `unavailable` when any position was unpriced.
    pub pricing: Pricing,
}

impl PortfolioSummaryResponse {
    /// Pairs a summary with the principal it belongs to.
    #[must_use]
    pub fn new(user: &UserPrincipal, summary: PortfolioSummary) -> Self {
        Self {
            user: user.to_string(),
            portfolio_value_usd: summary.portfolio_value_usd,
            deposited_usd: summary.deposited_usd,
            current_apy: summary.current_apy,
            total_yield_usd: summary.total_yield_usd,
            position_count: summary.position_count,
            unpriced_positions: summary.unpriced_positions,
            pricing: summary.pricing,
        }
    }
}

/// Response for `GET /users/{principal}/stats`.
#[derive(Debug, Serialize, ToSchema)]
pub struct UserStatsResponse {
    /// Canonical principal.
    pub user: String,
    /// Total TVL of the user's active strategies (string-encoded u128).
    pub total_tvl: String,
    /// Arithmetic-mean APY of those strategies.
    pub average_apy: f64,
    /// Number of active strategies held.
    pub strategy_count: usize,
    /// Sum of initial deposits, in USD.
    pub deposited_usd: f64,
}

impl UserStatsResponse {
    /// Pairs stats with the principal they belong to.
    #[must_use]
    pub fn new(user: &UserPrincipal, stats: UserStats) -> Self {
        Self {
            user: user.to_string(),
            total_tvl: stats.total_tvl.to_string(),
            average_apy: stats.average_apy,
            strategy_count: stats.strategy_count,
            deposited_usd: stats.deposited_usd,
        }
    }
}
