//! HTTP and `WebSocket` transport for the Gridkeeper simulation.
//!
//! This crate provides an Axum server that exposes:
//!
//! - **`WebSocket` endpoint** (`/ws`) carrying the session protocol: each
//!   connection becomes one session, inbound frames are parsed into
//!   [`ClientMessage`]s and outbound [`ServerMessage`]s are written as JSON
//!   text frames
//! - **REST endpoints** for reading the current grid snapshot and health
//! - **Minimal HTML status page** (`GET /`)
//!
//! # Architecture
//!
//! The server never touches simulation state. Connections talk to the
//! coordinator task through a [`CoordinatorHandle`], and REST reads come
//! from the `watch` channel the coordinator publishes after every step,
//! so HTTP traffic never blocks a tick.
//!
//! [`ClientMessage`]: gridkeeper_types::ClientMessage
//! [`ServerMessage`]: gridkeeper_types::ServerMessage
//! [`CoordinatorHandle`]: gridkeeper_core::runtime::CoordinatorHandle

pub mod error;
pub mod handlers;
pub mod router;
pub mod server;
pub mod startup;
pub mod state;
pub mod ws;

// Re-export primary types for convenience.
pub use router::build_router;
pub use server::{ServerConfig, ServerError, start_server};
pub use state::AppState;
