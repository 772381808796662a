//! Position resolution and valuation.
//!
//! [`resolve_positions`] picks the strategies a user holds shares in and
//! [`value_position`] turns one of them into a USD-denominated
//! [`UserPosition`]. Both are pure: they never fail and never produce NaN
//! or negative values. Missing prices, empty strategies, and strategies
//! without pools all degrade to zero, with [`Pricing::Unavailable`] set
//! where the zero is not a real valuation.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{Pool, StrategySnapshot, UserPrincipal};

/// Whether a value was computed from a known price.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Pricing {
    /// Every input needed for the valuation was present.
    #[default]
    Priced,
    /// A price or pool was missing; the value was substituted with zero.
    Unavailable,
}

impl Pricing {
    /// Combines two markers: unavailable wins.
    #[must_use]
    pub const fn and(self, other: Self) -> Self {
        match (self, other) {
            (Self::Priced, Self::Priced) => Self::Priced,
            _ => Self::Unavailable,
        }
    }
}

/// One user's stake in one strategy, valued in USD.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserPosition {
    /// Strategy the position belongs to.
    pub strategy_id: u32,
    /// Strategy display name.
    pub strategy_name: String,
    /// User shares divided by total shares, clamped to `[0, 1]`.
    pub share_fraction: f64,
    /// Share of the strategy TVL, in USD.
    pub current_value_usd: f64,
    /// The user's initial deposit, in USD at today's price.
    pub initial_value_usd: f64,
    /// `current_value_usd - initial_value_usd`.
    pub yield_usd: f64,
    /// Strategy APY in percent.
    pub apy: f64,
    /// Whether the USD figures rest on a known price.
    pub pricing: Pricing,
}

/// Returns the strategies in which `user` holds a non-zero share.
///
/// An empty or not-yet-loaded list yields an empty result. Whether the
/// data is still loading is reported separately by the data source.
#[must_use]
pub fn resolve_positions<'a>(
    strategies: &'a [StrategySnapshot],
    user: &UserPrincipal,
) -> Vec<&'a StrategySnapshot> {
    strategies
        .iter()
        .filter(|strategy| strategy.shares_of(user) > 0)
        .collect()
}

/// Fraction of a strategy owned by `user_shares`.
///
/// Zero when `total_shares` is zero; never above one even if the inputs
/// break the protocol invariant `user_shares <= total_shares`.
#[must_use]
pub fn share_fraction(user_shares: u128, total_shares: u128) -> f64 {
    if total_shares == 0 {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let fraction = user_shares as f64 / total_shares as f64;
    fraction.clamp(0.0, 1.0)
}

/// Converts a smallest-unit amount to USD: `amount / 10^decimals * price`.
#[must_use]
pub fn to_usd(amount: u128, decimals: u8, price: f64) -> f64 {
    #[allow(clippy::cast_precision_loss)]
    let whole = amount as f64 / 10f64.powi(i32::from(decimals));
    let value = whole * price;
    if value.is_finite() { value.max(0.0) } else { 0.0 }
}

/// Values `user`'s stake in `strategy`, priced through `pool`.
///
/// Decimals and price come from `pool.token0` only: deposits are
/// single-sided. A missing pool, a missing price, or a price that is
/// negative or not finite values the position at zero and marks it
/// [`Pricing::Unavailable`]. So does a strategy whose TVL was substituted
/// because its pool metrics were missing.
#[must_use]
pub fn value_position(
    strategy: &StrategySnapshot,
    pool: Option<&Pool>,
    user: &UserPrincipal,
) -> UserPosition {
    let fraction = share_fraction(strategy.shares_of(user), strategy.total_shares);

    let quote = pool.and_then(|p| {
        p.price0
            .filter(|price| price.is_finite() && *price >= 0.0)
            .map(|price| (p.token0.decimals, price))
    });
    let (decimals, price, pricing) = match quote {
        Some((decimals, price)) => (decimals, price, Pricing::Priced),
        None => (0, 0.0, Pricing::Unavailable),
    };
    let pricing = if strategy.metrics_missing {
        Pricing::Unavailable
    } else {
        pricing
    };

    let current_value_usd = fraction * to_usd(strategy.tvl, decimals, price);
    let initial_value_usd = to_usd(strategy.initial_deposit_of(user), decimals, price);

    UserPosition {
        strategy_id: strategy.id,
        strategy_name: strategy.name.clone(),
        share_fraction: fraction,
        current_value_usd,
        initial_value_usd,
        yield_usd: current_value_usd - initial_value_usd,
        apy: if strategy.apy.is_finite() { strategy.apy } else { 0.0 },
        pricing,
    }
}

/// Resolves and values every position `user` holds across `strategies`.
#[must_use]
pub fn value_positions(strategies: &[StrategySnapshot], user: &UserPrincipal) -> Vec<UserPosition> {
    resolve_positions(strategies, user)
        .into_iter()
        .map(|strategy| value_position(strategy, strategy.valuation_pool(), user))
        .collect()
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::strategy::tests::{pool, principal, strategy};

    const EPS: f64 = 1e-9;

    fn scenario() -> (Vec<StrategySnapshot>, UserPrincipal) {
        let user = principal("zv5zm-zyhmm");
        let mut a = strategy(1, 1000);
        a.user_shares.push((user.clone(), 100));
        a.initial_deposit.push((user.clone(), 8_000_000));
        a.tvl = 100_000_000;
        a.apy = 10.0;

        let mut b = strategy(2, 500);
        b.user_shares.push((user.clone(), 0));
        b.user_shares.push((principal("someone-else"), 500));

        (vec![a, b], user)
    }

    #[test]
    fn resolver_keeps_only_non_zero_holdings() {
        let (strategies, user) = scenario();
        let resolved = resolve_positions(&strategies, &user);
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved.first().map(|s| s.id), Some(1));
    }

    #[test]
    fn resolver_on_empty_input_is_empty() {
        assert!(resolve_positions(&[], &principal("abc")).is_empty());
    }

    #[test]
    fn two_strategy_scenario_values() {
        let (strategies, user) = scenario();
        let positions = value_positions(&strategies, &user);
        assert_eq!(positions.len(), 1);
        let Some(p) = positions.first() else {
            panic!("expected one position");
        };
        assert!((p.share_fraction - 0.1).abs() < EPS);
        assert!((p.current_value_usd - 0.10).abs() < EPS);
        assert!((p.initial_value_usd - 0.08).abs() < EPS);
        assert!((p.yield_usd - 0.02).abs() < EPS);
        assert!((p.apy - 10.0).abs() < EPS);
        assert_eq!(p.pricing, Pricing::Priced);
    }

    #[test]
    fn zero_total_shares_values_at_zero() {
        let user = principal("abc");
        let mut s = strategy(1, 0);
        s.user_shares.push((user.clone(), 50));
        s.tvl = 1_000_000_000;
        let p = value_position(&s, s.valuation_pool(), &user);
        assert!(p.share_fraction.abs() < EPS);
        assert!(p.current_value_usd.abs() < EPS);
        assert!(!p.current_value_usd.is_nan());
    }

    #[test]
    fn shares_above_total_are_clamped() {
        let user = principal("abc");
        let mut s = strategy(1, 10);
        s.user_shares.push((user.clone(), 50));
        s.tvl = 100_000_000;
        let p = value_position(&s, s.valuation_pool(), &user);
        assert!((p.share_fraction - 1.0).abs() < EPS);
        assert!((p.current_value_usd - 1.0).abs() < EPS);
    }

    #[test]
    fn missing_price_is_zero_and_flagged() {
        let user = principal("abc");
        let mut s = strategy(1, 100);
        s.pools = vec![pool("pool-1", 8, None)];
        s.user_shares.push((user.clone(), 10));
        s.initial_deposit.push((user.clone(), 1_000));
        s.tvl = 100_000_000;
        let p = value_position(&s, s.valuation_pool(), &user);
        assert!(p.current_value_usd.abs() < EPS);
        assert!(p.initial_value_usd.abs() < EPS);
        assert_eq!(p.pricing, Pricing::Unavailable);
    }

    #[test]
    fn substituted_metrics_mark_position_unavailable() {
        let (mut strategies, user) = scenario();
        for s in &mut strategies {
            s.apply_metrics(&std::collections::HashMap::new());
        }
        let positions = value_positions(&strategies, &user);
        let Some(p) = positions.first() else {
            panic!("expected one position");
        };
        assert!(p.current_value_usd.abs() < EPS);
        assert_eq!(p.pricing, Pricing::Unavailable);
    }

    #[test]
    fn strategy_without_pools_does_not_panic() {
        let user = principal("abc");
        let mut s = strategy(1, 100);
        s.pools.clear();
        s.current_pool = None;
        s.user_shares.push((user.clone(), 10));
        let positions = value_positions(&[s], &user);
        assert_eq!(positions.len(), 1);
        assert_eq!(positions.first().map(|p| p.pricing), Some(Pricing::Unavailable));
    }

    #[test]
    fn negative_price_never_yields_negative_value() {
        let user = principal("abc");
        let mut s = strategy(1, 100);
        s.pools = vec![pool("pool-1", 8, Some(-3.0))];
        s.user_shares.push((user.clone(), 100));
        s.tvl = 100_000_000;
        let p = value_position(&s, s.valuation_pool(), &user);
        assert!(p.current_value_usd >= 0.0);
        assert_eq!(p.pricing, Pricing::Unavailable);
    }

    #[test]
    fn to_usd_scales_by_decimals() {
        assert!((to_usd(1_500_000, 6, 2.0) - 3.0).abs() < EPS);
        assert!((to_usd(0, 18, 1000.0)).abs() < EPS);
    }
}
