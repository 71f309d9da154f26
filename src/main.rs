use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info};

mod api;
mod config;
mod models;
mod services;
mod storage;
mod validation;

use config::Config;
use storage::ConnectionRegistry;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = Config::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    // Load the connection store
    let registry = Arc::new(ConnectionRegistry::load(&config.storage.connections_file).await);
    info!(
        "Loaded {} connection(s) from {}",
        registry.list().await.len(),
        config.storage.connections_file
    );

    // Create router with state
    let app: Router = api::routes::create_router_with_state(registry, config.clone());

    // Start server
    let addr: SocketAddr = config.server_address().parse()?;
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
