//! Portfolio-level aggregation.
//!
//! [`PortfolioSummary::aggregate`] folds valued positions into dashboard
//! totals. The fold is order-independent: every total is a plain sum, so
//! permuting the input changes results by floating-point rounding only.

use serde::{Deserialize, Serialize};

use super::position::{Pricing, UserPosition, to_usd};
use super::{StrategySnapshot, UserPrincipal};

/// Totals across every strategy a user holds shares in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSummary {
    /// Sum of current position values, in USD.
    pub portfolio_value_usd: f64,
    /// Sum of initial deposit values, in USD.
    pub deposited_usd: f64,
    /// APY weighted by each position's share of the portfolio value.
    pub current_apy: f64,
    /// Sum of per-position yield, in USD.
    pub total_yield_usd: f64,
    /// Number of positions folded in.
    pub position_count: usize,
    /// Positions whose value was substituted because a price was missing.
    pub unpriced_positions: usize,
    /// `Unavailable` when at least one position was unpriced.
    pub pricing: Pricing,
}

impl PortfolioSummary {
    /// Aggregates valued positions.
    ///
    /// `current_apy` is 0 when the portfolio value is 0, including the
    /// case where every position is unpriced.
    #[must_use]
    pub fn aggregate(positions: &[UserPosition]) -> Self {
        let portfolio_value_usd: f64 = positions.iter().map(|p| p.current_value_usd).sum();
        let deposited_usd: f64 = positions.iter().map(|p| p.initial_value_usd).sum();
        let total_yield_usd: f64 = positions.iter().map(|p| p.yield_usd).sum();
        let weighted_apy: f64 = positions.iter().map(|p| p.apy * p.current_value_usd).sum();

        let current_apy = if portfolio_value_usd > 0.0 {
            weighted_apy / portfolio_value_usd
        } else {
            0.0
        };

        let unpriced_positions = positions
            .iter()
            .filter(|p| p.pricing == Pricing::Unavailable)
            .count();
        let pricing = positions
            .iter()
            .fold(Pricing::Priced, |acc, p| acc.and(p.pricing));

        Self {
            portfolio_value_usd,
            deposited_usd,
            current_apy: if current_apy.is_finite() { current_apy } else { 0.0 },
            total_yield_usd,
            position_count: positions.len(),
            unpriced_positions,
            pricing,
        }
    }
}

/// Headline figures for the profile card.
///
/// Unlike [`PortfolioSummary::current_apy`], `average_apy` is the plain
/// arithmetic mean over the user's active strategies.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserStats {
    /// Sum of strategy TVL over the user's active strategies.
    pub total_tvl: u128,
    /// Arithmetic mean of those strategies' APY.
    pub average_apy: f64,
    /// Number of active strategies the user holds shares in.
    pub strategy_count: usize,
    /// Sum of the user's initial deposits, in USD.
    pub deposited_usd: f64,
}

impl UserStats {
    /// Computes stats over the strategies the user holds shares in.
    ///
    /// Inactive strategies are skipped, matching the strategy listing.
    #[must_use]
    pub fn compute(held: &[&StrategySnapshot], user: &UserPrincipal) -> Self {
        let mut stats = Self::default();
        let mut apy_sum = 0.0;
        for strategy in held.iter().filter(|s| s.is_active()) {
            stats.total_tvl = stats.total_tvl.saturating_add(strategy.tvl);
            apy_sum += strategy.apy;
            stats.strategy_count += 1;
            if let Some(pool) = strategy.valuation_pool() {
                stats.deposited_usd += to_usd(
                    strategy.initial_deposit_of(user),
                    pool.token0.decimals,
                    pool.price0.unwrap_or(0.0),
                );
            }
        }
        if stats.strategy_count > 0 {
            #[allow(clippy::cast_precision_loss)]
            let count = stats.strategy_count as f64;
            stats.average_apy = apy_sum / count;
        }
        stats
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::position::{resolve_positions, value_positions};
    use crate::domain::strategy::tests::{principal, strategy};

    const EPS: f64 = 1e-9;

    fn position(id: u32, value: f64, initial: f64, apy: f64) -> UserPosition {
        UserPosition {
            strategy_id: id,
            strategy_name: String::new(),
            share_fraction: 0.5,
            current_value_usd: value,
            initial_value_usd: initial,
            yield_usd: value - initial,
            apy,
            pricing: Pricing::Priced,
        }
    }

    #[test]
    fn single_position_takes_full_weight() {
        let user = principal("zv5zm-zyhmm");
        let mut a = strategy(1, 1000);
        a.user_shares.push((user.clone(), 100));
        a.initial_deposit.push((user.clone(), 8_000_000));
        a.tvl = 100_000_000;
        a.apy = 10.0;
        let b = strategy(2, 500);

        let summary = PortfolioSummary::aggregate(&value_positions(&[a, b], &user));
        assert!((summary.portfolio_value_usd - 0.10).abs() < EPS);
        assert!((summary.deposited_usd - 0.08).abs() < EPS);
        assert!((summary.current_apy - 10.0).abs() < EPS);
        assert!((summary.total_yield_usd - 0.02).abs() < EPS);
        assert_eq!(summary.position_count, 1);
        assert_eq!(summary.pricing, Pricing::Priced);
    }

    #[test]
    fn apy_is_value_weighted() {
        let positions = vec![position(1, 300.0, 250.0, 10.0), position(2, 100.0, 100.0, 30.0)];
        let summary = PortfolioSummary::aggregate(&positions);
        assert!((summary.current_apy - 15.0).abs() < EPS);
    }

    #[test]
    fn zero_value_portfolio_has_zero_apy() {
        let mut positions = vec![position(1, 0.0, 0.0, 10.0), position(2, 0.0, 0.0, 40.0)];
        for p in &mut positions {
            p.pricing = Pricing::Unavailable;
        }
        let summary = PortfolioSummary::aggregate(&positions);
        assert!(!summary.current_apy.is_nan());
        assert!(summary.current_apy.abs() < EPS);
        assert_eq!(summary.unpriced_positions, 2);
        assert_eq!(summary.pricing, Pricing::Unavailable);
    }

    #[test]
    fn empty_portfolio_is_all_zero() {
        let summary = PortfolioSummary::aggregate(&[]);
        assert_eq!(summary, PortfolioSummary::default());
    }

    #[test]
    fn totals_are_order_independent() {
        let positions = vec![
            position(1, 1234.5678, 1000.1, 7.5),
            position(2, 0.1, 0.3, 120.0),
            position(3, 98_765.4321, 90_000.0, 3.25),
            position(4, 0.000_001, 0.0, 0.0),
            position(5, 55.55, 60.0, 18.0),
        ];
        let forward = PortfolioSummary::aggregate(&positions);

        let mut reversed = positions.clone();
        reversed.reverse();
        let mut rotated = positions.clone();
        rotated.rotate_left(2);
        let mut swapped = positions;
        swapped.swap(0, 4);
        swapped.swap(1, 3);

        for permutation in [reversed, rotated, swapped] {
            let other = PortfolioSummary::aggregate(&permutation);
            assert!((forward.portfolio_value_usd - other.portfolio_value_usd).abs() < EPS);
            assert!((forward.deposited_usd - other.deposited_usd).abs() < EPS);
            assert!((forward.total_yield_usd - other.total_yield_usd).abs() < EPS);
            assert!((forward.current_apy - other.current_apy).abs() < EPS);
        }
    }

    #[test]
    fn user_stats_use_arithmetic_mean_over_active() {
        let user = principal("abc");
        let mut a = strategy(1, 100);
        a.user_shares.push((user.clone(), 10));
        a.initial_deposit.push((user.clone(), 200_000_000));
        a.tvl = 1_000;
        a.apy = 10.0;
        let mut b = strategy(2, 100);
        b.user_shares.push((user.clone(), 10));
        b.tvl = 3_000;
        b.apy = 20.0;
        let mut inactive = strategy(3, 100);
        inactive.user_shares.push((user.clone(), 10));
        inactive.current_pool = None;
        inactive.apy = 99.0;

        let all = [a, b, inactive];
        let held = resolve_positions(&all, &user);
        let stats = UserStats::compute(&held, &user);
        assert_eq!(stats.strategy_count, 2);
        assert_eq!(stats.total_tvl, 4_000);
        assert!((stats.average_apy - 15.0).abs() < EPS);
        assert!((stats.deposited_usd - 2.0).abs() < EPS);
    }

    #[test]
    fn user_stats_empty_is_zero() {
        let stats = UserStats::compute(&[], &principal("abc"));
        assert_eq!(stats, UserStats::default());
    }
}
