//! Hex Settlers multiplayer game server.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod protocol;
mod room;
mod server;

use server::ServerState;

const DEFAULT_SWEEP_INTERVAL_MS: u64 = 250;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Parse address from env or use default
    let addr: SocketAddr = std::env::var("SERVER_ADDR")
        .unwrap_or_else(|_| "0.0.0.0:8080".into())
        .parse()?;

    let sweep_ms: u64 = match std::env::var("SWEEP_INTERVAL_MS") {
        Ok(raw) => raw.parse()?,
        Err(_) => DEFAULT_SWEEP_INTERVAL_MS,
    };
    let sweep_interval = Duration::from_millis(sweep_ms.max(1));

    info!(?sweep_interval, "Starting Hex Settlers server...");

    let state = Arc::new(ServerState::new());
    tokio::spawn(server::run_sweeper(Arc::clone(&state), sweep_interval));

    server::run_server(addr, state).await
}
