//! REST endpoint handlers organized by resource.

pub mod events;
pub mod ingest;
pub mod portfolio;
pub mod strategy;
pub mod system;

use axum::Router;

use crate::app_state::AppState;

/// Composes all resource routes under `/api/v1`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(strategy::routes())
        .merge(portfolio::routes())
        .merge(events::routes())
        .merge(ingest::routes())
}
