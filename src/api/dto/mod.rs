//! Data Transfer Objects for REST request/response serialization.
//!
//! Response amounts are serialized as JSON strings to prevent precision
//! loss on u128 values.

pub mod common_dto;
pub mod event_dto;
pub mod ingest_dto;
pub mod portfolio_dto;
pub mod strategy_dto;

pub use common_dto::*;
pub use event_dto::*;
pub use ingest_dto::*;
pub use portfolio_dto::*;
pub use strategy_dto::*;
