//! Playground Server

use std::net::SocketAddr;

use playground_server::{create_router, AppState, ServerConfig};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    // Load config
    let config = ServerConfig::from_env();
    let addr: SocketAddr = config.bind_addr.parse()?;

    info!(
        addr = %addr,
        default_endpoint = config.default_endpoint.as_deref().unwrap_or("-"),
        "Starting playground server"
    );

    let state = AppState::new(config);
    let router = create_router(state);

    let listener = TcpListener::bind(addr).await?;
    info!("HTTP server listening on {}", addr);
    axum::serve(listener, router).await?;

    Ok(())
}
