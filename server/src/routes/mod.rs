//! HTTP route definitions.

mod auth;
mod data;
mod health;
mod notifications;
mod ws;

use crate::AppState;
use axum::Router;

/// Create all application routes.
pub fn create_routes() -> Router<AppState> {
    Router::new()
        .merge(health::routes())
        .merge(data::routes())
        .merge(auth::routes())
        .merge(notifications::routes())
        .merge(ws::routes())
}
