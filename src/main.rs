//! vault-portfolio-gateway server entry point.
//!
//! Starts the Axum HTTP server with REST and WebSocket endpoints.

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use vault_portfolio_gateway::app::build_app;
use vault_portfolio_gateway::app_state::AppState;
use vault_portfolio_gateway::config::{GatewayConfig, LogFormat};
use vault_portfolio_gateway::source::{InMemoryMarketStore, MarketSeed};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = GatewayConfig::from_env()?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
        LogFormat::Pretty => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
    tracing::info!(addr = %config.listen_addr, "starting vault-portfolio-gateway");

    // Build source layer
    let store = match &config.seed_file {
        Some(path) => {
            let text = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("reading seed file {}", path.display()))?;
            let seed = MarketSeed::from_json(&text)?;
            let store = InMemoryMarketStore::from_seed(seed).await?;
            tracing::info!(path = %path.display(), "market store seeded");
            store
        }
        None => InMemoryMarketStore::new(),
    };

    // Build application state
    let app_state = AppState::in_memory(
        Arc::new(store),
        config.pool_metrics_ttl(),
        config.event_bus_capacity,
        config.event_page_size_max,
    );

    // Build router
    let app = build_app(app_state);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app).await?;

    Ok(())
}
