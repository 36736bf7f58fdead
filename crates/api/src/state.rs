//! Shared application state for the Axum API server.

use std::sync::Arc;

use wayfarer_notifier::DispatchJob;

/// Application state shared across all route handlers via Axum `State`.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<DispatchJob>,
}

impl AppState {
    pub fn new(dispatcher: Arc<DispatchJob>) -> Self {
        Self { dispatcher }
    }
}
