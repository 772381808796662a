//! Audit events emitted by the vault.
//!
//! Each [`EventRecord`] carries a closed [`EventKind`]: the operation that
//! ran and how far it got. Failure is read from [`Outcome::Failed`], never
//! from the spelling of a tag. On the wire the kind is its canonical tag,
//! e.g. `"StrategyDepositFailed"`.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::UserPrincipal;
use crate::error::GatewayError;

/// The lifecycle operation an event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operation {
    /// User deposit into a strategy.
    StrategyDeposit,
    /// User withdrawal from a strategy.
    StrategyWithdraw,
    /// Strategy moving liquidity between pools.
    StrategyRebalance,
    /// Token swap on an exchange.
    SwapToken,
    /// Liquidity provision into a pool.
    AddLiquidityToPool,
    /// Liquidity removal from a pool.
    WithdrawLiquidityFromPool,
}

impl Operation {
    /// Every operation, in declaration order.
    pub const ALL: [Self; 6] = [
        Self::StrategyDeposit,
        Self::StrategyWithdraw,
        Self::StrategyRebalance,
        Self::SwapToken,
        Self::AddLiquidityToPool,
        Self::WithdrawLiquidityFromPool,
    ];

    /// Tag prefix used in canonical kind names.
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::StrategyDeposit => "StrategyDeposit",
            Self::StrategyWithdraw => "StrategyWithdraw",
            Self::StrategyRebalance => "StrategyRebalance",
            Self::SwapToken => "SwapToken",
            Self::AddLiquidityToPool => "AddLiquidityToPool",
            Self::WithdrawLiquidityFromPool => "WithdrawLiquidityFromPool",
        }
    }

    /// Human-readable title.
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::StrategyDeposit => "Strategy Deposit",
            Self::StrategyWithdraw => "Strategy Withdraw",
            Self::StrategyRebalance => "Strategy Rebalance",
            Self::SwapToken => "Swap Token",
            Self::AddLiquidityToPool => "Add Liquidity to Pool",
            Self::WithdrawLiquidityFromPool => "Withdraw Liquidity from Pool",
        }
    }
}

/// How far an operation got.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    /// The operation began.
    Started,
    /// The operation finished successfully.
    Completed,
    /// The operation aborted with an error.
    Failed,
}

impl Outcome {
    /// Every outcome, in lifecycle order.
    pub const ALL: [Self; 3] = [Self::Started, Self::Completed, Self::Failed];

    /// Tag suffix used in canonical kind names.
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Started => "Started",
            Self::Completed => "Completed",
            Self::Failed => "Failed",
        }
    }
}

/// Closed event type: an operation paired with its outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EventKind {
    /// Which operation.
    pub operation: Operation,
    /// Which stage.
    pub outcome: Outcome,
}

impl EventKind {
    /// Pairs an operation with an outcome.
    #[must_use]
    pub const fn new(operation: Operation, outcome: Outcome) -> Self {
        Self { operation, outcome }
    }

    /// Every kind, grouped by operation.
    pub fn all() -> impl Iterator<Item = Self> {
        Operation::ALL
            .into_iter()
            .flat_map(|op| Outcome::ALL.into_iter().map(move |outcome| Self::new(op, outcome)))
    }

    /// Returns `true` for the failed stage of any operation.
    #[must_use]
    pub fn is_failure(self) -> bool {
        self.outcome == Outcome::Failed
    }

    /// Canonical tag, e.g. `"SwapTokenCompleted"`.
    #[must_use]
    pub fn canonical_name(self) -> String {
        format!("{}{}", self.operation.tag(), self.outcome.tag())
    }

    /// Human-readable title, e.g. `"Swap Token Completed"`.
    #[must_use]
    pub fn title(self) -> String {
        format!("{} {}", self.operation.title(), self.outcome.tag())
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.operation.tag(), self.outcome.tag())
    }
}

impl FromStr for EventKind {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        for operation in Operation::ALL {
            let Some(rest) = s.strip_prefix(operation.tag()) else {
                continue;
            };
            if let Some(outcome) = Outcome::ALL.into_iter().find(|o| o.tag() == rest) {
                return Ok(Self::new(operation, outcome));
            }
        }
        Err(GatewayError::InvalidRequest(format!("unknown event kind: {s}")))
    }
}

impl TryFrom<String> for EventKind {
    type Error = GatewayError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<EventKind> for String {
    fn from(kind: EventKind) -> Self {
        kind.canonical_name()
    }
}

/// Error attached to a failed event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventError {
    /// Vault error code, when reported.
    #[serde(default)]
    pub code: Option<u32>,
    /// Error message.
    pub message: String,
}

/// Operation-specific payload. Every field is optional; which ones are
/// set depends on the event kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDetails {
    /// Strategy the operation ran against.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy_id: Option<u32>,
    /// Pool involved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pool_id: Option<String>,
    /// Token0 amount.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount0: Option<u128>,
    /// Token1 amount.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount1: Option<u128>,
    /// Shares moved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shares: Option<u128>,
    /// Total pool shares at the time of the event.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_shares: Option<u128>,
    /// Swap input token ledger.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_in: Option<String>,
    /// Swap output token ledger.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_out: Option<String>,
    /// Swap input amount.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount_in: Option<u128>,
    /// Swap output amount.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount_out: Option<u128>,
    /// Pool a rebalance moved away from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_pool_id: Option<String>,
    /// Pool a rebalance moved into.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_pool_id: Option<String>,
    /// Error of a failed operation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<EventError>,
}

/// Immutable audit entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Monotonically increasing id.
    pub id: u64,
    /// Nanoseconds since the Unix epoch.
    pub timestamp_ns: u64,
    /// Event type.
    pub kind: EventKind,
    /// Key shared by every event of one logical user operation.
    pub correlation_id: String,
    /// Initiating user; absent for system-level events.
    #[serde(default)]
    pub user: Option<UserPrincipal>,
    /// Operation-specific payload.
    #[serde(default)]
    pub details: EventDetails,
}

impl EventRecord {
    /// Event time, or `None` if the nanosecond count overflows.
    #[must_use]
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        i64::try_from(self.timestamp_ns)
            .ok()
            .map(DateTime::from_timestamp_nanos)
    }

    /// Returns `true` if the event was initiated by `user`.
    #[must_use]
    pub fn is_from(&self, user: &UserPrincipal) -> bool {
        self.user.as_ref() == Some(user)
    }

    /// One-line human-readable description of the event.
    #[must_use]
    pub fn summary(&self) -> String {
        let d = &self.details;
        let strategy = or_na(d.strategy_id.map(|id| id.to_string()));
        let error = d
            .error
            .as_ref()
            .map_or_else(|| "Unknown error".to_string(), |e| e.message.clone());

        match (self.kind.operation, self.kind.outcome) {
            (Operation::StrategyDeposit, Outcome::Started) => format!(
                "Started deposit of {} tokens into strategy {strategy}",
                or_zero(d.amount0)
            ),
            (Operation::StrategyDeposit, Outcome::Completed) => format!(
                "Successfully deposited {} tokens into strategy {strategy}",
                or_zero(d.amount0)
            ),
            (Operation::StrategyDeposit, Outcome::Failed) => {
                format!("Failed to deposit into strategy {strategy}: {error}")
            }
            (Operation::StrategyWithdraw, Outcome::Started) => format!(
                "Started withdrawal of {} shares from strategy {strategy}",
                or_zero(d.shares)
            ),
            (Operation::StrategyWithdraw, Outcome::Completed) => format!(
                "Successfully withdrew {} shares from strategy {strategy}",
                or_zero(d.shares)
            ),
            (Operation::StrategyWithdraw, Outcome::Failed) => {
                format!("Failed to withdraw from strategy {strategy}: {error}")
            }
            (Operation::StrategyRebalance, Outcome::Started) => format!(
                "Started rebalancing strategy {strategy} from pool {}",
                or_na(d.previous_pool_id.clone())
            ),
            (Operation::StrategyRebalance, Outcome::Completed) => format!(
                "Successfully rebalanced strategy {strategy} from pool {} to pool {}",
                or_na(d.previous_pool_id.clone()),
                or_na(d.new_pool_id.clone())
            ),
            (Operation::StrategyRebalance, Outcome::Failed) => {
                format!("Failed to rebalance strategy {strategy}: {error}")
            }
            (Operation::SwapToken, Outcome::Started) => format!(
                "Started swapping {} tokens from {} to {}",
                or_zero(d.amount_in),
                or_na(d.token_in.clone()),
                or_na(d.token_out.clone())
            ),
            (Operation::SwapToken, Outcome::Completed) => format!(
                "Successfully swapped {} tokens for {} tokens",
                or_zero(d.amount_in),
                or_zero(d.amount_out)
            ),
            (Operation::SwapToken, Outcome::Failed) => format!("Failed to swap tokens: {error}"),
            (Operation::AddLiquidityToPool, Outcome::Started) => format!(
                "Started adding liquidity: {} token0 + {} token1",
                or_zero(d.amount0),
                or_zero(d.amount1)
            ),
            (Operation::AddLiquidityToPool, Outcome::Completed) => format!(
                "Successfully added liquidity: {} token0 + {} token1",
                or_zero(d.amount0),
                or_zero(d.amount1)
            ),
            (Operation::AddLiquidityToPool, Outcome::Failed) => {
                format!("Failed to add liquidity: {error}")
            }
            (Operation::WithdrawLiquidityFromPool, Outcome::Started) => format!(
                "Started withdrawing {} shares from pool {}",
                or_zero(d.shares),
                or_na(d.pool_id.clone())
            ),
            (Operation::WithdrawLiquidityFromPool, Outcome::Completed) => format!(
                "Successfully withdrew {} shares, received {} token0 + {} token1",
                or_zero(d.shares),
                or_zero(d.amount0),
                or_zero(d.amount1)
            ),
            (Operation::WithdrawLiquidityFromPool, Outcome::Failed) => {
                format!("Failed to withdraw liquidity: {error}")
            }
        }
    }
}

/// Keeps the events initiated by `user`, preserving order.
#[must_use]
pub fn filter_by_user(records: Vec<EventRecord>, user: &UserPrincipal) -> Vec<EventRecord> {
    records.into_iter().filter(|r| r.is_from(user)).collect()
}

fn or_zero(amount: Option<u128>) -> String {
    amount.unwrap_or(0).to_string()
}

fn or_na(value: Option<String>) -> String {
    value.unwrap_or_else(|| "N/A".to_string())
}
