//! WebSocket layer: connection handling, message routing, subscriptions.
//!
//! The WebSocket endpoint at `/ws` pushes feed events to clients that
//! follow specific principals (or `*`) and answers portfolio queries.

pub mod connection;
pub mod handler;
pub mod messages;
pub mod subscription;
