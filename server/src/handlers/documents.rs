//! Document handlers - fetch and overwrite collection documents.
//!
//! Every successful write is fanned out to subscribers as the collection's
//! full new value. Writes to `draws` additionally plan and dispatch draw
//! notifications for each round whose value changed.

use fairway_engine::{plan_notifications, CollectionName, Shape};
use serde_json::Value;
use sqlx::PgPool;

use super::dispatch_draw_notifications;
use crate::db;
use crate::error::{AppError, Result};
use crate::websocket::{ConnectionManager, ServerMessage};

/// Only containers (or `null`, meaning delete) are valid documents.
pub fn validate_document(value: &Value) -> Result<()> {
    match value {
        Value::Object(_) | Value::Array(_) | Value::Null => Ok(()),
        other => Err(AppError::BadRequest(format!(
            "document must be an object, array or null, got {}",
            type_name(other)
        ))),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Rounds whose value differs between two versions of the draws document.
///
/// Returns `(round_id, before, after)` in round order.
pub fn changed_rounds(
    before: Option<Value>,
    after: Option<Value>,
) -> Vec<(String, Option<Value>, Option<Value>)> {
    let mut before = Shape::ingest(before).into_entries();
    let after = Shape::ingest(after).into_entries();

    let mut changes = Vec::new();
    for (round_id, value) in after {
        let previous = before.remove(&round_id);
        if previous.as_ref() != Some(&value) {
            changes.push((round_id, previous, Some(value)));
        }
    }
    changes.extend(before.into_iter().map(|(round_id, v)| (round_id, Some(v), None)));
    changes.sort_by(|a, b| a.0.cmp(&b.0));
    changes
}

/// Read a whole collection document; missing documents read as `null`.
pub async fn handle_fetch(pool: &PgPool, collection: CollectionName) -> Result<Value> {
    Ok(db::get_document(pool, collection.as_str())
        .await?
        .unwrap_or(Value::Null))
}

/// Overwrite a whole collection document.
pub async fn handle_push(
    pool: &PgPool,
    conn_manager: &ConnectionManager,
    collection: CollectionName,
    value: Value,
) -> Result<()> {
    validate_document(&value)?;

    let before = db::put_document(pool, collection.as_str(), &value).await?;
    let after = Some(value).filter(|v| !v.is_null());

    tracing::info!(collection = %collection, deleted = after.is_none(), "document written");

    conn_manager.broadcast_changed(collection, ServerMessage::changed(collection, after.clone()));

    if collection == CollectionName::Draws {
        for (round_id, before, after) in changed_rounds(before, after) {
            notify_round(pool, conn_manager, &round_id, before.as_ref(), after.as_ref()).await;
        }
    }

    Ok(())
}

/// Read one child (a single round, player, ...) of a collection document.
pub async fn handle_child_fetch(
    pool: &PgPool,
    collection: CollectionName,
    key: &str,
) -> Result<Value> {
    Ok(db::get_child(pool, collection.as_str(), key)
        .await?
        .unwrap_or(Value::Null))
}

/// Set or delete (`None`) one child of a collection document.
pub async fn handle_child_put(
    pool: &PgPool,
    conn_manager: &ConnectionManager,
    collection: CollectionName,
    key: &str,
    value: Option<Value>,
) -> Result<()> {
    if let Some(value) = &value {
        validate_document(value)?;
    }
    if key.is_empty() {
        return Err(AppError::BadRequest("child key must not be empty".to_string()));
    }

    let (before, after) = db::put_child(pool, collection.as_str(), key, value.as_ref()).await?;

    tracing::info!(collection = %collection, key = %key, deleted = after.is_none(), "child written");

    let document = db::get_document(pool, collection.as_str()).await?;
    conn_manager.broadcast_changed(collection, ServerMessage::changed(collection, document));

    if collection == CollectionName::Draws && before != after {
        notify_round(pool, conn_manager, key, before.as_ref(), after.as_ref()).await;
    }

    Ok(())
}

/// Notification failures never fail the write that triggered them.
async fn notify_round(
    pool: &PgPool,
    conn_manager: &ConnectionManager,
    round_id: &str,
    before: Option<&Value>,
    after: Option<&Value>,
) {
    let Some(plan) = plan_notifications(round_id, before, after) else {
        tracing::debug!(round_id = %round_id, "draw deleted, skipping notifications");
        return;
    };

    if let Err(e) = dispatch_draw_notifications(pool, conn_manager, &plan).await {
        tracing::error!(round_id = %round_id, "draw notification dispatch failed: {}", e);
    }
}
