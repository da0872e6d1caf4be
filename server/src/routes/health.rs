//! Liveness and connection counts.

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    /// Open WebSocket connections
    pub connections: usize,
    /// Players with at least one open connection
    pub players: usize,
    /// Database connections currently held by the pool
    pub db_connections: u32,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/", get(|| async { "Fairway Remote Store" }))
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let manager = &state.conn_manager;
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        connections: manager.connection_count(),
        players: manager.player_count(),
        db_connections: state.pool.size(),
    })
}
