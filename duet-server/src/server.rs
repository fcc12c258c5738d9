use crate::config::ServerConfig;
use crate::room::{RandomCodeGenerator, RoomRegistry};
use crate::signaling::{SignalingService, SignalingState, ws_handler};
use anyhow::{Context, Result};
use axum::{Router, routing::get};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

/// Wires the outbound service into a fresh registry.
pub fn build_state(config: &ServerConfig) -> SignalingState {
    let service = SignalingService::new(config.ice_servers.clone());
    let registry = RoomRegistry::new(
        Arc::new(service.clone()),
        Arc::new(RandomCodeGenerator),
        config.room_config(),
    );
    SignalingState { service, registry }
}

pub fn router(state: SignalingState) -> Router {
    // Browser clients are served from another origin.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(|| async { "ok" }))
        .layer(cors)
        .with_state(state)
}

pub async fn serve_with_listener(listener: TcpListener, state: SignalingState) -> Result<()> {
    let addr = listener.local_addr()?;
    info!("Signaling server listening on http://{}", addr);
    axum::serve(listener, router(state))
        .await
        .context("Signaling server stopped")
}

pub async fn serve(config: ServerConfig) -> Result<()> {
    config.validate()?;
    let listener = TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind))?;
    serve_with_listener(listener, build_state(&config)).await
}
