//! OpenAPI documentation configuration.
//!
//! Schemas are collected from the handler annotations; Swagger UI is
//! mounted by [`crate::app::build_app`] when the `swagger-ui` feature is on.

use utoipa::OpenApi;

use crate::api::handlers::{events, ingest, portfolio, strategy, system};

/// OpenAPI documentation structure.
#[derive(Debug, OpenApi)]
#[openapi(
    info(
        title = "Vault Portfolio Gateway API",
        description = "Portfolio valuations, strategy listings, and correlated activity feeds \
                       for yield-vault strategies.",
        license(name = "MIT")
    ),
    tags(
        (name = "System", description = "Health check and static catalogs"),
        (name = "Strategies", description = "Strategy listing and APY history"),
        (name = "Portfolio", description = "Per-user positions and totals"),
        (name = "Events", description = "Correlated audit event feed"),
        (name = "Ingestion", description = "Market data ingestion")
    ),
    paths(
        system::health_handler,
        system::event_kinds_handler,
        strategy::list_strategies,
        strategy::get_strategy,
        strategy::strategy_history,
        portfolio::user_positions,
        portfolio::portfolio_summary,
        portfolio::user_stats,
        events::list_event_groups,
        ingest::replace_snapshot,
        ingest::upsert_pool_metrics,
        ingest::record_events,
        ingest::append_history,
    )
)]
pub struct ApiDoc;

/// Returns the OpenAPI JSON specification.
#[must_use]
pub fn openapi_json() -> String {
    ApiDoc::openapi().to_pretty_json().unwrap_or_default()
}
