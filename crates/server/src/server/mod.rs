//! Axum HTTP server, routing, and request handlers.
//!
//! # Responsibilities
//! - Define the Axum router with all routes and shared middleware.
//! - Inject shared application state (`AppState`) into handlers.
//! - Apply each route's encryption policy via the payload layer.

pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;
