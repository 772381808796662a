//! Strategy APY history and chart series.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::error::GatewayError;

/// Days of history requested from the history source, whatever the period.
pub const HISTORY_WINDOW_DAYS: i64 = 30;

/// Snapshots per day in the history feed (one per hour).
const SNAPSHOTS_PER_DAY: usize = 24;

/// Chart time range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChartPeriod {
    /// Last 24 hours, one point per hour.
    #[serde(rename = "24h")]
    Day,
    /// Last week, one point per day.
    #[serde(rename = "1w")]
    Week,
    /// Last month, one point per day.
    #[serde(rename = "1m")]
    Month,
}

impl ChartPeriod {
    /// Query-string form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Day => "24h",
            Self::Week => "1w",
            Self::Month => "1m",
        }
    }

    /// Number of points a full series has.
    #[must_use]
    pub const fn points(self) -> usize {
        match self {
            Self::Day => 24,
            Self::Week => 7,
            Self::Month => 30,
        }
    }
}

impl fmt::Display for ChartPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChartPeriod {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "24h" => Ok(Self::Day),
            "1w" => Ok(Self::Week),
            "1m" => Ok(Self::Month),
            other => Err(GatewayError::InvalidPeriod(other.to_string())),
        }
    }
}

/// One APY sample of a strategy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ApySnapshot {
    /// Nanoseconds since the Unix epoch.
    pub timestamp_ns: u64,
    /// APY in percent.
    pub apy: f64,
}

impl ApySnapshot {
    /// UTC hour of day of the sample, or `None` if the timestamp overflows.
    #[must_use]
    pub fn hour(&self) -> Option<u32> {
        let nanos = i64::try_from(self.timestamp_ns).ok()?;
        Some(DateTime::from_timestamp_nanos(nanos).hour())
    }
}

/// A chart point: `x` is the hour or day index.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    /// Hour (0..24) or day (0..7 / 0..30) index.
    pub x: u32,
    /// APY in percent.
    pub y: f64,
}

/// Chart series of one strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyChartSeries {
    /// Strategy the series belongs to.
    pub strategy_id: u32,
    /// Points in `x` order.
    pub data: Vec<ChartPoint>,
}

/// Builds chart points from raw snapshots.
///
/// `Day` yields 24 hourly points: each hour takes the earliest snapshot in
/// that UTC hour, or carries the previous value forward (0 at the start).
/// `Week` and `Month` sample every 24th snapshot and stop when the data
/// runs out. No snapshots means no points.
#[must_use]
pub fn chart_series(mut snapshots: Vec<ApySnapshot>, period: ChartPeriod) -> Vec<ChartPoint> {
    if snapshots.is_empty() {
        return Vec::new();
    }
    snapshots.sort_by_key(|s| s.timestamp_ns);

    match period {
        ChartPeriod::Day => {
            let mut points: Vec<ChartPoint> = Vec::with_capacity(period.points());
            for hour in 0..24u32 {
                let y = snapshots
                    .iter()
                    .find(|s| s.hour() == Some(hour))
                    .map(|s| s.apy)
                    .or_else(|| points.last().map(|p| p.y))
                    .unwrap_or(0.0);
                points.push(ChartPoint { x: hour, y });
            }
            points
        }
        ChartPeriod::Week | ChartPeriod::Month => snapshots
            .iter()
            .step_by(SNAPSHOTS_PER_DAY)
            .take(period.points())
            .zip(0u32..)
            .map(|(s, day)| ChartPoint { x: day, y: s.apy })
            .collect(),
    }
}
