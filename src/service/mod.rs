//! Service layer: business logic orchestration.
//!
//! [`PortfolioService`] reads market data through the source traits, runs
//! the pure portfolio core, and emits ingestion events through the
//! [`super::domain::EventBus`].

pub mod portfolio_service;

pub use portfolio_service::{EventGroupPage, PortfolioService, StrategyListing};
