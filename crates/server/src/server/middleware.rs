//! Axum middleware layers applied to the router.
//!
//! Includes request tracing, timeout enforcement, and response compression.

use std::time::Duration;

/// Default per-request timeout applied to all routes.
///
/// Individual crypto operations are fast and never interrupted; this bounds
/// slow clients and stalled connections at the HTTP layer.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
