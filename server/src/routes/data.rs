//! Collection document routes.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use fairway_engine::CollectionName;
use serde_json::Value;

use crate::auth::AuthUser;
use crate::error::Result;
use crate::handlers::{handle_child_fetch, handle_child_put, handle_fetch, handle_push};
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/data/{collection}", get(fetch_handler).put(push_handler))
        .route(
            "/data/{collection}/{key}",
            get(child_fetch_handler)
                .put(child_put_handler)
                .delete(child_delete_handler),
        )
}

fn parse_collection(raw: &str) -> Result<CollectionName> {
    Ok(raw.parse::<CollectionName>()?)
}

/// GET /data/{collection} - the stored document, or `null`.
async fn fetch_handler(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(collection): Path<String>,
) -> Result<Json<Value>> {
    let collection = parse_collection(&collection)?;
    Ok(Json(handle_fetch(&state.pool, collection).await?))
}

/// PUT /data/{collection} - overwrite the document.
async fn push_handler(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(collection): Path<String>,
    Json(value): Json<Value>,
) -> Result<StatusCode> {
    let collection = parse_collection(&collection)?;
    handle_push(&state.pool, &state.conn_manager, collection, value).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /data/{collection}/{key}
async fn child_fetch_handler(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path((collection, key)): Path<(String, String)>,
) -> Result<Json<Value>> {
    let collection = parse_collection(&collection)?;
    Ok(Json(handle_child_fetch(&state.pool, collection, &key).await?))
}

/// PUT /data/{collection}/{key}
async fn child_put_handler(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path((collection, key)): Path<(String, String)>,
    Json(value): Json<Value>,
) -> Result<StatusCode> {
    let collection = parse_collection(&collection)?;
    handle_child_put(&state.pool, &state.conn_manager, collection, &key, Some(value)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /data/{collection}/{key}
async fn child_delete_handler(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path((collection, key)): Path<(String, String)>,
) -> Result<StatusCode> {
    let collection = parse_collection(&collection)?;
    handle_child_put(&state.pool, &state.conn_manager, collection, &key, None).await?;
    Ok(StatusCode::NO_CONTENT)
}
