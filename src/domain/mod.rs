//! Domain layer: identities, strategy snapshots, the portfolio core, and
//! the event system.
//!
//! Everything here except [`EventBus`] is synchronous and pure. Resolution,
//! valuation, aggregation, and correlation grouping take plain values and
//! never fail.

pub mod event_bus;
pub mod event_group;
pub mod event_record;
pub mod feed_event;
pub mod history;
pub mod portfolio;
pub mod position;
pub mod principal;
pub mod strategy;

pub use event_bus::EventBus;
pub use event_group::{EventGroup, group_events};
pub use event_record::{
    EventDetails, EventError, EventKind, EventRecord, Operation, Outcome, filter_by_user,
};
pub use feed_event::FeedEvent;
pub use history::{ApySnapshot, ChartPeriod, ChartPoint, StrategyChartSeries, chart_series};
pub use portfolio::{PortfolioSummary, UserStats};
pub use position::{Pricing, UserPosition, resolve_positions, value_position, value_positions};
pub use principal::UserPrincipal;
pub use strategy::{Pool, PoolMetrics, ProfitLevel, StrategySnapshot, TokenInfo};
