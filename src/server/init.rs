/**
 * Server Initialization
 *
 * This module handles initialization of the Axum HTTP server: state
 * creation, route configuration, and the background housekeeping task.
 *
 * # Initialization Process
 *
 * 1. Create the coordinator and its state stores
 * 2. Configure the router (`/ws` upgrade, `/healthz`, 404 fallback)
 * 3. Spawn the periodic housekeeping task
 *
 * The coordinator is entirely in-memory; there is nothing to restore on
 * startup and nothing survives a restart. Clients are expected to
 * reconnect and re-identify, which rebuilds presence from scratch.
 */

use crate::server::config::CoordinatorConfig;
use crate::server::state::AppState;
use crate::ws::ws_upgrade_handler;
use axum::Router;

/// Create and configure the Axum application.
///
/// # Routes
///
/// - `GET /ws` - WebSocket upgrade into the connection actor
/// - `GET /healthz` - liveness probe
/// - anything else - 404
pub async fn create_app(config: &CoordinatorConfig) -> Router<()> {
    tracing::info!("Initializing huddle coordinator");

    // Step 1: Create the coordinator and its state stores
    let app_state = AppState::new();

    // Step 2: Configure routes
    let app = create_router(app_state.clone());

    // Step 3: Periodic housekeeping: log coordinator gauges so operators
    // can watch connection churn without a metrics stack
    let coordinator = app_state.coordinator.clone();
    let period = config.housekeeping_interval;
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            tracing::debug!(
                "[Housekeeping] {} connection(s), {} room(s), {} user(s) online",
                coordinator.registry().connection_count(),
                coordinator.rooms().room_count(),
                coordinator.presence().online_count()
            );
        }
    });

    tracing::info!("Router configured with housekeeping task");
    app
}

/// Assemble the router over the application state.
pub fn create_router(app_state: AppState) -> Router<()> {
    Router::new()
        .route("/ws", axum::routing::get(ws_upgrade_handler))
        .route("/healthz", axum::routing::get(|| async { "OK" }))
        .fallback(|| async { "404 Not Found" })
        .with_state(app_state)
}
