//! Notification routes.

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use fairway_engine::Role;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::AuthUser;
use crate::db::{self, StoredNotification};
use crate::error::Result;
use crate::handlers::handle_test_notification;
use crate::AppState;

const DEFAULT_HISTORY_LIMIT: i64 = 50;
const MAX_HISTORY_LIMIT: i64 = 500;

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    #[serde(default)]
    pub round: Option<String>,
    #[serde(default)]
    pub limit: Option<i64>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/notifications/test/{reg}", post(test_handler))
        .route("/notifications/history", get(history_handler))
}

/// POST /notifications/test/{reg} - admin only.
async fn test_handler(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(reg): Path<String>,
) -> Result<Json<Value>> {
    auth.require(Role::Admin)?;
    let delivered = handle_test_notification(&state.conn_manager, &reg)?;
    Ok(Json(json!({ "success": true, "delivered": delivered })))
}

/// GET /notifications/history - admin only.
async fn history_handler(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<StoredNotification>>> {
    auth.require(Role::Admin)?;
    let limit = query
        .limit
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .clamp(1, MAX_HISTORY_LIMIT);
    let history = db::list_notification_history(&state.pool, query.round.as_deref(), limit).await?;
    Ok(Json(history))
}
