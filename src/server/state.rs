/**
 * Application State Management
 *
 * This module defines the application state structure and implements the
 * `FromRef` traits for Axum state extraction.
 *
 * # Architecture
 *
 * `AppState` is the central state container handed to the router. It holds
 * the coordinator, which in turn owns every live, mutable piece of the
 * subsystem (registry, room table, presence). The coordinator is behind an
 * `Arc` so each connection actor shares one instance.
 *
 * # State Extraction
 *
 * The `FromRef` implementation lets handlers that only need the
 * coordinator extract `Arc<Coordinator>` directly, following Axum's
 * recommended pattern for substate extraction.
 */

use crate::coordinator::Coordinator;
use axum::extract::FromRef;
use std::sync::Arc;

/// Application state for the coordinator server.
#[derive(Clone)]
pub struct AppState {
    /// The realtime coordinator shared by every connection actor
    pub coordinator: Arc<Coordinator>,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            coordinator: Arc::new(Coordinator::new()),
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

/// Allow handlers to extract `Arc<Coordinator>` directly from `AppState`.
impl FromRef<AppState> for Arc<Coordinator> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.coordinator.clone()
    }
}
