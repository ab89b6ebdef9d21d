pub mod args;
pub mod error;
pub mod helpers;
pub mod hub;
pub mod powerup;
pub mod registry;
pub mod room;
pub mod scoring;
pub mod session;
pub mod socket;
pub mod timer;
pub mod turn;
pub mod voting;

use crate::{
    hub::ConnectionHub,
    session::{GameConfig, SessionOrchestrator},
};
use axum::{http::StatusCode, response::IntoResponse, routing::get, Router};
use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::prelude::*;

pub fn setup_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wordchain_server=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_file(false)
                .with_target(false),
        )
        .init();
}

#[derive(Clone)]
pub struct AppState {
    pub session: SessionOrchestrator,
    pub hub: Arc<ConnectionHub>,
}

impl AppState {
    pub fn new(config: GameConfig) -> Self {
        let hub = Arc::new(ConnectionHub::new());
        let session = SessionOrchestrator::new(config, hub.clone());
        Self { session, hub }
    }
}

pub async fn run(addr: SocketAddr, config: GameConfig) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("listening on {}", listener.local_addr()?);
    serve(listener, config).await
}

/// Serves on an already-bound listener.
pub async fn serve(listener: TcpListener, config: GameConfig) -> anyhow::Result<()> {
    axum::serve(listener, app(AppState::new(config))).await?;
    Ok(())
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/ws", get(socket::ws_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn health_handler() -> impl IntoResponse {
    StatusCode::OK
}
