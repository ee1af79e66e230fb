//! Shared application state.

use crate::gateway::InferenceGateway;

/// Shared application state passed to all handlers.
pub struct AppState {
    pub gateway: InferenceGateway,
}

impl AppState {
    pub fn new(gateway: InferenceGateway) -> Self {
        Self { gateway }
    }
}
