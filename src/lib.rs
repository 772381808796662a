//! # vault-portfolio-gateway
//!
//! REST API and WebSocket gateway that turns yield-vault strategy data into
//! per-user portfolio views.
//!
//! The core is pure: it resolves which strategies a user holds shares in,
//! values each position in USD, folds positions into portfolio totals, and
//! groups audit events by correlation id. Everything around it (sources,
//! caching, HTTP, WebSocket) feeds that core and exposes its results.
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP, WebSocket)
//!     │
//!     ├── REST Handlers (api/)
//!     ├── WS Handler (ws/)
//!     │
//!     ├── PortfolioService (service/)
//!     ├── EventBus (domain/)
//!     │
//!     ├── Resolver / Valuation / Aggregator / Grouper (domain/)
//!     │
//!     ├── Source traits + TTL cache (source/)
//!     └── InMemoryMarketStore
//! ```

pub mod api;
pub mod app;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod openapi;
pub mod service;
pub mod source;
pub mod ws;
