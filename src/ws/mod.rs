//! WebSocket layer: connection handling, message routing, subscriptions.
//!
//! The WebSocket endpoint at `/ws` streams record store change events for
//! the collections a client subscribed to, and answers sync commands.

pub mod connection;
pub mod handler;
pub mod messages;
pub mod subscription;
