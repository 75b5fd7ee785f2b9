/**
 * Huddle Coordinator Entry Point
 *
 * Starts the Axum HTTP server hosting the realtime presence and broadcast
 * coordinator.
 */

use huddle::server::{create_app, CoordinatorConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env file if present
    dotenv::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(&env_filter))
        .init();

    let config = CoordinatorConfig::load();
    let app = create_app(&config).await;

    let addr = config.socket_addr();
    tracing::info!("Starting coordinator on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
