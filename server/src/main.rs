//! Fairway Server - the Remote Store for fairway devices.
//!
//! Serves one JSON document per tournament collection over HTTP, pushes
//! changes to subscribed WebSocket clients, resolves identities and roles,
//! and dispatches draw notifications when a round's draw is written.

mod auth;
mod config;
mod db;
mod error;
mod handlers;
mod routes;
mod websocket;

use crate::config::Config;
use crate::db::Pool;
use crate::websocket::ConnectionManager;
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub pool: Pool,
    pub config: Arc<Config>,
    pub conn_manager: Arc<ConnectionManager>,
}

/// Build the router with its middleware stack.
fn app(state: AppState) -> Router {
    Router::new()
        .merge(routes::create_routes())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fairway_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    tracing::info!(
        require_auth = config.require_auth,
        "Starting Fairway Server on {}:{}",
        config.host,
        config.port
    );

    let pool = db::create_pool(&config).await?;

    tracing::info!("Running database migrations...");
    db::run_migrations(&pool).await?;

    if let Some(admin) = &config.admin {
        handlers::bootstrap_admin(&pool, admin).await?;
    }

    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        conn_manager: ConnectionManager::new_shared(),
    };

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app(state)).await?;

    Ok(())
}
