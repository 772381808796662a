//! Strategy listing and history DTOs.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::{
    ChartPoint, Pool, ProfitLevel, StrategyChartSeries, StrategySnapshot, TokenInfo,
};
use crate::service::StrategyListing;

/// Token metadata.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TokenDto {
    /// Ledger canister id.
    pub ledger: String,
    /// Ticker symbol (e.g. `"ICP"`).
    pub symbol: String,
    /// Number of decimal places.
    pub decimals: u8,
}

impl From<&TokenInfo> for TokenDto {
    fn from(token: &TokenInfo) -> Self {
        Self {
            ledger: token.ledger.clone(),
            symbol: token.symbol.clone(),
            decimals: token.decimals,
        }
    }
}

/// One pool a strategy may allocate to.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PoolDto {
    /// Pool identifier.
    pub id: String,
    /// Exchange name.
    pub provider: String,
    /// Deposit-side token.
    pub token0: TokenDto,
    /// Counter token.
    pub token1: TokenDto,
    /// USD price of token0, if known.
    pub price0: Option<f64>,
    /// USD price of token1, if known.
    pub price1: Option<f64>,
    /// Pool TVL (string-encoded u128).
    pub tvl: String,
    /// Pool APY in percent.
    pub apy: f64,
}

impl From<&Pool> for PoolDto {
    fn from(pool: &Pool) -> Self {
        Self {
            id: pool.id.clone(),
            provider: pool.provider.clone(),
            token0: TokenDto::from(&pool.token0),
            token1: TokenDto::from(&pool.token1),
            price0: pool.price0,
            price1: pool.price1,
            tvl: pool.tvl.to_string(),
            apy: pool.apy,
        }
    }
}

/// Strategy as returned by `GET /strategies` and `GET /strategies/{id}`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StrategyDto {
    /// Strategy identifier.
    pub id: u32,
    /// Display name.
    pub name: String,
    /// Display description.
    pub description: String,
    /// Whether the strategy has an active pool.
    pub active: bool,
    /// Active pool id.
    pub current_pool: Option<String>,
    /// Total shares outstanding (string-encoded u128).
    pub total_shares: String,
    /// Strategy TVL in token0 smallest units (string-encoded u128).
    pub tvl: String,
    /// APY in percent.
    pub apy: f64,
    /// Listing badge derived from TVL.
    pub profit_level: ProfitLevel,
    /// Number of users holding shares.
    pub holders: usize,
    /// Candidate pools.
    pub pools: Vec<PoolDto>,
}

impl From<StrategyListing> for StrategyDto {
    fn from(listing: StrategyListing) -> Self {
        let StrategyListing {
            strategy,
            profit_level,
        } = listing;
        let StrategySnapshot {
            id,
            name,
            description,
            total_shares,
            user_shares,
            current_pool,
            pools,
            tvl,
            apy,
            ..
        } = strategy;
        Self {
            id,
            name,
            description,
            active: current_pool.is_some(),
            current_pool,
            total_shares: total_shares.to_string(),
            tvl: tvl.to_string(),
            apy,
            profit_level,
            holders: user_shares.iter().filter(|(_, shares)| *shares > 0).count(),
            pools: pools.iter().map(PoolDto::from).collect(),
        }
    }
}

/// List response for `GET /strategies`.
#[derive(Debug, Serialize, ToSchema)]
pub struct StrategyListResponse {
    /// Active strategies.
    pub data: Vec<StrategyDto>,
}

/// Query parameters for `GET /strategies/history`.
#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct HistoryQuery {
    /// Comma-separated strategy ids, e.g. `1,2,3`.
    pub ids: String,
    /// `24h`, `1w`, or `1m`. Defaults to `24h`.
    #[serde(default)]
    pub period: Option<String>,
}

/// One chart point.
#[derive(Debug, Clone, Copy, Serialize, ToSchema)]
pub struct ChartPointDto {
    /// Hour or day index.
    pub x: u32,
    /// APY in percent.
    pub y: f64,
}

impl From<ChartPoint> for ChartPointDto {
    fn from(point: ChartPoint) -> Self {
        Self {
            x: point.x,
            y: point.y,
        }
    }
}

/// Chart series of one strategy.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StrategyChartDto {
    /// Strategy identifier.
    pub strategy_id: u32,
    /// Points in `x` order.
    pub data: Vec<ChartPointDto>,
}

impl From<StrategyChartSeries> for StrategyChartDto {
    fn from(series: StrategyChartSeries) -> Self {
        Self {
            strategy_id: series.strategy_id,
            data: series.data.into_iter().map(ChartPointDto::from).collect(),
        }
    }
}

/// Response for `GET /strategies/history`.
#[derive(Debug, Serialize, ToSchema)]
pub struct StrategyHistoryResponse {
    /// Period echoed back.
    pub period: String,
    /// One series per requested strategy.
    pub data: Vec<StrategyChartDto>,
}
