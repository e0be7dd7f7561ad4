//! HTTP liveness surface for uptime monitors and container platforms.

use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use tokio_util::sync::CancellationToken;
use tracing::info;

use snipe_core::{cache::DeletionCache, ports::PlatformStats, status::ActivityMonitor};

const FALLBACK_TEXT: &str = "Discord Snipe Bot is running";

#[derive(Clone)]
pub struct HealthState {
    pub deletions: Arc<DeletionCache>,
    pub monitor: Arc<ActivityMonitor>,
    pub platform: Arc<dyn PlatformStats>,
}

pub fn router(state: HealthState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/ping", get(ping_handler))
        .fallback(fallback_handler)
        .with_state(state)
}

pub async fn serve(addr: SocketAddr, state: HealthState, cancel: CancellationToken) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("health server listening on {addr}");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await?;
    Ok(())
}

async fn health_handler(State(state): State<HealthState>) -> impl IntoResponse {
    Json(state.monitor.snapshot(&state.deletions, state.platform.as_ref()))
}

async fn ping_handler(State(state): State<HealthState>) -> &'static str {
    state.monitor.touch();
    "pong"
}

async fn fallback_handler() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, FALLBACK_TEXT)
}
