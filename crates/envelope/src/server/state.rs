//! Shared application state injected into every Axum handler.

use std::sync::Arc;

use crate::envelope::EnvelopeService;

/// Application state shared across all request handlers.
///
/// Cloned per request; the service itself is immutable and shared via `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<EnvelopeService>,
}

impl AppState {
    /// Create a new [`AppState`] around `service`.
    pub fn new(service: EnvelopeService) -> Self {
        Self {
            service: Arc::new(service),
        }
    }
}
