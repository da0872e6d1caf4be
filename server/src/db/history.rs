//! Database operations for the notification_history table.

use fairway_engine::{DrawChange, NotificationPlan};
use serde::Serialize;
use sqlx::{PgPool, Row};

/// Record one draw-notification dispatch.
///
/// `delivered` counts the players that had a live delivery channel; the
/// plan's recipients are the players that should have been told.
pub async fn insert_notification_record(
    pool: &PgPool,
    plan: &NotificationPlan,
    tournament_name: &str,
    delivered: usize,
) -> Result<(), sqlx::Error> {
    let kind = match plan.change {
        DrawChange::InitialPublish => "initial_publish",
        DrawChange::Update => "update",
    };

    sqlx::query(
        r#"
        INSERT INTO notification_history (
            round_id, tournament_id, tournament_name, kind, recipient_count, player_count
        )
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(&plan.round_id)
    .bind(&plan.tournament_id)
    .bind(tournament_name)
    .bind(kind)
    .bind(delivered as i32)
    .bind(plan.recipients.len() as i32)
    .execute(pool)
    .await?;

    Ok(())
}

/// A stored notification_history row.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredNotification {
    pub id: i64,
    pub round_id: String,
    pub tournament_id: String,
    pub tournament_name: String,
    pub kind: String,
    pub recipient_count: i32,
    pub player_count: i32,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for StoredNotification {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(StoredNotification {
            id: row.try_get("id")?,
            round_id: row.try_get("round_id")?,
            tournament_id: row.try_get("tournament_id")?,
            tournament_name: row.try_get("tournament_name")?,
            kind: row.try_get("kind")?,
            recipient_count: row.try_get("recipient_count")?,
            player_count: row.try_get("player_count")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

/// Most recent dispatches first, optionally for one round only.
pub async fn list_notification_history(
    pool: &PgPool,
    round_id: Option<&str>,
    limit: i64,
) -> Result<Vec<StoredNotification>, sqlx::Error> {
    sqlx::query_as::<_, StoredNotification>(
        r#"
        SELECT id, round_id, tournament_id, tournament_name, kind,
               recipient_count, player_count, created_at
        FROM notification_history
        WHERE $1::TEXT IS NULL OR round_id = $1
        ORDER BY created_at DESC, id DESC
        LIMIT $2
        "#,
    )
    .bind(round_id)
    .bind(limit)
    .fetch_all(pool)
    .await
}
