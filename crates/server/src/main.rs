//! Sealdesk API server

use anyhow::Result;
use sealdesk_server::{app, AppConfig, AppState};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("sealdesk_server=info".parse()?)
                .add_directive("signing=info".parse()?)
                .add_directive("tower_http=debug".parse()?),
        )
        .init();

    let config = AppConfig::from_env();
    let port = config.port;

    info!("Initializing sealdesk API...");
    let state = Arc::new(AppState::new(config).await?);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Starting sealdesk API on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app(state)).await?;

    Ok(())
}
