use std::net::SocketAddr;

use tracing_subscriber::EnvFilter;

use board_engine::config::EngineConfig;
use board_engine::feed::{FeedStore, load_global};
use board_engine::web::{AppState, create_router};

const DEFAULT_ADDR: &str = "127.0.0.1:3000";

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("board_engine=info")),
        )
        .init();

    let addr: SocketAddr = std::env::var("BOARD_ADDR")
        .unwrap_or_else(|_| DEFAULT_ADDR.to_string())
        .parse()
        .expect("BOARD_ADDR must be a socket address");

    // Static data is required; realtime feeds arrive over PUT /feeds/:feed
    let global_path =
        std::env::var("BOARD_GLOBAL_PATH").expect("BOARD_GLOBAL_PATH must name a static data file");
    let global = load_global(&global_path).expect("Failed to load static data");

    let config = match std::env::var("BOARD_CONFIG_PATH") {
        Ok(path) => EngineConfig::load(&path).expect("Failed to load engine config"),
        Err(_) => {
            tracing::info!("BOARD_CONFIG_PATH not set, using default engine config");
            EngineConfig::default()
        }
    };

    let state = AppState::new(FeedStore::new(global), config);
    let app = create_router(state);

    tracing::info!(%addr, "departure board engine listening");
    tracing::info!("  GET  /health             - Health check");
    tracing::info!("  GET  /board              - Departure board for stops");
    tracing::info!("  GET  /stops/:id/status   - Alert status for a stop");
    tracing::info!("  PUT  /feeds/:feed        - Replace a feed snapshot");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listener");
    axum::serve(listener, app).await.expect("Server error");
}
