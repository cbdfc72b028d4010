//! Chat Rooms Server - Entry Point
//!
//! Opens the store, starts the directory actor and serves the HTTP routes.

use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use chat_rooms::{build_router, AppState, Config, Store};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Initialize logging with environment filter
    // Use RUST_LOG env var to control log level
    // e.g., RUST_LOG=debug or RUST_LOG=chat_rooms=trace
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("chat_rooms=info")),
        )
        .init();

    let config = Config::from_env();

    let store = Store::connect(&config.database_url).await?;
    info!("Store opened at {}", config.database_url);

    let state = AppState::new(store, &config);
    let app = build_router(state);

    let listener = TcpListener::bind(&config.bind_addr).await?;
    info!("Chat server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
