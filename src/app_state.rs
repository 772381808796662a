//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::domain::EventBus;
use crate::service::PortfolioService;
use crate::source::{InMemoryMarketStore, MarketSources};

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Portfolio service for all business logic.
    pub portfolio_service: Arc<PortfolioService>,
    /// Event bus for WebSocket subscriptions.
    pub event_bus: EventBus,
}

impl AppState {
    /// Wires the service, sources, and event bus around one in-memory
    /// store.
    #[must_use]
    pub fn in_memory(
        store: Arc<InMemoryMarketStore>,
        metrics_ttl: chrono::Duration,
        event_bus_capacity: usize,
        max_page_size: u32,
    ) -> Self {
        let event_bus = EventBus::new(event_bus_capacity);
        let sources = MarketSources::from_store(&store, metrics_ttl);
        let portfolio_service = Arc::new(PortfolioService::new(
            sources,
            store,
            event_bus.clone(),
            max_page_size,
        ));
        Self {
            portfolio_service,
            event_bus,
        }
    }
}
