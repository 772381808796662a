//! Strategy and pool snapshots as delivered by the vault.
//!
//! A [`StrategySnapshot`] is read-only: it is replaced wholesale on every
//! refresh and never mutated in place, apart from the TVL/APY enrichment
//! applied from pool metrics before aggregation.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::UserPrincipal;

/// Ledger token descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenInfo {
    /// Ledger canister id of the token.
    #[serde(default)]
    pub ledger: String,
    /// Ticker symbol (e.g. `"ICP"`).
    pub symbol: String,
    /// Number of decimal places of the smallest unit.
    pub decimals: u8,
}

/// One liquidity venue backing a strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pool {
    /// Pool identifier, unique within a strategy.
    pub id: String,
    /// Exchange that hosts the pool (e.g. `"KongSwap"`).
    #[serde(default)]
    pub provider: String,
    /// Deposit-side token.
    pub token0: TokenInfo,
    /// Counter token.
    pub token1: TokenInfo,
    /// USD price of one whole token0, if the price feed has one.
    #[serde(default)]
    pub price0: Option<f64>,
    /// USD price of one whole token1, if the price feed has one.
    #[serde(default)]
    pub price1: Option<f64>,
    /// Pool-level TVL in token0 smallest units.
    #[serde(default)]
    pub tvl: u128,
    /// Pool-level APY in percent.
    #[serde(default)]
    pub apy: f64,
}

/// TVL/APY reported by the pool metrics source for one pool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PoolMetrics {
    /// Total value locked in token0 smallest units.
    pub tvl: u128,
    /// Annualized yield in percent.
    pub apy: f64,
}

/// A yield strategy at a point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategySnapshot {
    /// Strategy identifier.
    pub id: u32,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Display description.
    #[serde(default)]
    pub description: String,
    /// Total ownership units outstanding.
    pub total_shares: u128,
    /// Shares held per user. At most one entry per principal.
    #[serde(default)]
    pub user_shares: Vec<(UserPrincipal, u128)>,
    /// Raw token0 amount each user originally deposited.
    #[serde(default)]
    pub initial_deposit: Vec<(UserPrincipal, u128)>,
    /// Id of the active pool; `None` means the strategy is inactive.
    #[serde(default)]
    pub current_pool: Option<String>,
    /// Every pool the strategy may allocate to.
    #[serde(default)]
    pub pools: Vec<Pool>,
    /// Strategy TVL in token0 smallest units.
    #[serde(default)]
    pub tvl: u128,
    /// APY of the active pool in percent.
    #[serde(default)]
    pub apy: f64,
    /// Set by [`Self::apply_metrics`] when the active pool had no metrics
    /// entry and `tvl`/`apy` were substituted with zero.
    #[serde(skip)]
    pub metrics_missing: bool,
}

impl StrategySnapshot {
    /// Returns `true` if the strategy has an active pool.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.current_pool.is_some()
    }

    /// Shares held by `user`, or 0 when the user has no entry.
    #[must_use]
    pub fn shares_of(&self, user: &UserPrincipal) -> u128 {
        lookup(&self.user_shares, user)
    }

    /// Raw initial deposit of `user`, or 0 when the user has no entry.
    #[must_use]
    pub fn initial_deposit_of(&self, user: &UserPrincipal) -> u128 {
        lookup(&self.initial_deposit, user)
    }

    /// The pool whose id matches `current_pool`.
    #[must_use]
    pub fn active_pool(&self) -> Option<&Pool> {
        let current = self.current_pool.as_deref()?;
        self.pools.iter().find(|pool| pool.id == current)
    }

    /// Pool used to price the strategy's deposit token: the active pool,
    /// falling back to the first listed pool.
    #[must_use]
    pub fn valuation_pool(&self) -> Option<&Pool> {
        self.active_pool().or_else(|| self.pools.first())
    }

    /// Overwrites `tvl` and `apy` from the metrics of the active pool.
    ///
    /// Inactive strategies are left untouched. A missing metrics entry
    /// counts as zero TVL and zero APY and sets `metrics_missing`.
    pub fn apply_metrics(&mut self, metrics: &HashMap<String, PoolMetrics>) {
        let Some(current) = self.current_pool.as_deref() else {
            return;
        };
        let found = metrics.get(current).copied();
        self.metrics_missing = found.is_none();
        let found = found.unwrap_or_default();
        self.tvl = found.tvl;
        self.apy = found.apy;
    }

    /// Checks the structural invariants callers rely on.
    ///
    /// # Errors
    ///
    /// Returns a description of the first violated invariant: duplicate
    /// principals in `user_shares` or `initial_deposit`, duplicate pool
    /// ids, or a `current_pool` that names no listed pool.
    pub fn validate(&self) -> Result<(), String> {
        ensure_unique_principals(self.id, "user_shares", &self.user_shares)?;
        ensure_unique_principals(self.id, "initial_deposit", &self.initial_deposit)?;

        let mut pool_ids = HashSet::with_capacity(self.pools.len());
        for pool in &self.pools {
            if !pool_ids.insert(pool.id.as_str()) {
                return Err(format!("strategy {}: duplicate pool id {}", self.id, pool.id));
            }
        }
        if let Some(current) = self.current_pool.as_deref()
            && !pool_ids.contains(current)
        {
            return Err(format!(
                "strategy {}: current pool {current} is not among its pools",
                self.id
            ));
        }
        Ok(())
    }
}

/// Badge shown next to a strategy in listings, derived from its TVL.
///
/// Smaller strategies are riskier and pay more, so the level runs opposite
/// to TVL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProfitLevel {
    /// TVL above 1,000,000.
    Low,
    /// TVL above 100,000.
    Medium,
    /// Everything smaller.
    High,
}

impl ProfitLevel {
    /// Classifies a strategy by its TVL.
    #[must_use]
    pub const fn from_tvl(tvl: u128) -> Self {
        if tvl > 1_000_000 {
            Self::Low
        } else if tvl > 100_000 {
            Self::Medium
        } else {
            Self::High
        }
    }
}

fn lookup(entries: &[(UserPrincipal, u128)], user: &UserPrincipal) -> u128 {
    entries
        .iter()
        .find(|(principal, _)| principal == user)
        .map_or(0, |(_, amount)| *amount)
}

fn ensure_unique_principals(
    strategy_id: u32,
    field: &str,
    entries: &[(UserPrincipal, u128)],
) -> Result<(), String> {
    let mut seen = HashSet::with_capacity(entries.len());
    for (principal, _) in entries {
        if !seen.insert(principal) {
            return Err(format!(
                "strategy {strategy_id}: duplicate {field} entry for {principal}"
            ));
        }
    }
    Ok(())
}
