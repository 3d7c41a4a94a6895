//! Axum middleware layers applied to the router.
//!
//! Includes request tracing, timeout enforcement, and response compression.

use std::time::Duration;

/// Default per-request timeout applied to all routes.
///
/// `KMS_TIMEOUT_MS` is validated against this at startup so that a stalled
/// Key Service surfaces as a classified failure, not a bare 408.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
