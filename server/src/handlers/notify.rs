//! Draw-notification dispatch.
//!
//! Delivers planned notices to the WebSocket connections registered under
//! each recipient's registration number and records the dispatch.

use fairway_engine::{normalize_records, CollectionName, DrawNotice, NotificationPlan};
use serde_json::Value;
use sqlx::PgPool;

use crate::db;
use crate::error::{AppError, Result};
use crate::websocket::{ConnectionManager, ServerMessage};

/// Name used when a tournament record has none.
const DEFAULT_TOURNAMENT_NAME: &str = "Tournament";

/// Find a tournament's display name in the tournaments document.
///
/// Returns `None` when the tournament does not exist.
pub fn tournament_name(tournaments: Option<Value>, tournament_id: &str) -> Option<String> {
    normalize_records(CollectionName::Tournaments, tournaments)
        .into_iter()
        .find(|t| t.get("tournamentId").and_then(Value::as_str) == Some(tournament_id))
        .map(|t| {
            t.get("name")
                .and_then(Value::as_str)
                .filter(|n| !n.is_empty())
                .unwrap_or(DEFAULT_TOURNAMENT_NAME)
                .to_string()
        })
}

/// Render the notices for a plan.
pub fn render_notices(plan: &NotificationPlan, tournament_name: &str) -> Vec<DrawNotice> {
    plan.recipients
        .iter()
        .map(|assignment| plan.notice_for(assignment, tournament_name))
        .collect()
}

/// Send every notice in `plan` and record the dispatch.
///
/// Returns how many recipients had at least one live connection.
pub async fn dispatch_draw_notifications(
    pool: &PgPool,
    conn_manager: &ConnectionManager,
    plan: &NotificationPlan,
) -> Result<usize> {
    if plan.is_empty() {
        tracing::info!(round_id = %plan.round_id, "no players to notify");
        return Ok(0);
    }

    let tournaments = db::get_document(pool, CollectionName::Tournaments.as_str()).await?;
    let Some(name) = tournament_name(tournaments, &plan.tournament_id) else {
        tracing::error!(
            round_id = %plan.round_id,
            tournament_id = %plan.tournament_id,
            "tournament not found, skipping notifications"
        );
        return Ok(0);
    };

    let delivered = render_notices(plan, &name)
        .into_iter()
        .filter(|notice| {
            let reg = notice.reg.clone();
            let sent = conn_manager.send_to_player(
                &reg,
                ServerMessage::DrawNotification {
                    notice: notice.clone(),
                },
            );
            if sent == 0 {
                tracing::debug!(reg = %reg, "no connection for player");
            }
            sent > 0
        })
        .count();

    tracing::info!(
        round_id = %plan.round_id,
        change = ?plan.change,
        players = plan.recipients.len(),
        delivered,
        "draw notifications dispatched"
    );

    db::insert_notification_record(pool, plan, &name, delivered).await?;

    Ok(delivered)
}

/// Send a fixed test notice to one player's connections.
pub fn handle_test_notification(conn_manager: &ConnectionManager, reg: &str) -> Result<usize> {
    let notice = DrawNotice {
        reg: reg.to_uppercase(),
        title: "Test Notification".to_string(),
        body: "This is a test notification from Fairway".to_string(),
        round_id: String::new(),
        tournament_id: String::new(),
        starting_tee: String::new(),
        tee_time: String::new(),
        is_update: false,
    };

    match conn_manager.send_to_player(reg, ServerMessage::DrawNotification { notice }) {
        0 => Err(AppError::NotFound(format!("no connection for player {reg}"))),
        sent => Ok(sent),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fairway_engine::plan_notifications;
    use serde_json::json;

    #[test]
    fn tournament_lookup_in_either_shape() {
        let keyed = json!({"KLA-T0001": {"tournamentId": "KLA-T0001", "name": "Spring Cup"}});
        assert_eq!(
            tournament_name(Some(keyed), "KLA-T0001").as_deref(),
            Some("Spring Cup")
        );

        let legacy = json!([{"tournamentId": "T2"}]);
        assert_eq!(
            tournament_name(Some(legacy.clone()), "T2").as_deref(),
            Some(DEFAULT_TOURNAMENT_NAME)
        );
        assert_eq!(tournament_name(Some(legacy), "T3"), None);
        assert_eq!(tournament_name(None, "T2"), None);
    }

    #[test]
    fn notices_follow_plan() {
        let after = json!({
            "publishedAt": 1,
            "groups": [{"startingTee": "1", "teeTime": "07:30", "players": [{"reg": "P1"}, {"reg": "P2"}]}]
        });
        let plan = plan_notifications("T1_round_1", None, Some(&after)).unwrap();
        let notices = render_notices(&plan, "Cup");
        assert_eq!(notices.len(), 2);
        assert_eq!(notices[0].title, "Draw List Published");
        assert_eq!(notices[1].reg, "P2");
        assert!(!notices[1].is_update);
    }

    #[test]
    fn test_notification_needs_a_connection() {
        let manager = ConnectionManager::new();
        assert!(matches!(
            handle_test_notification(&manager, "P1"),
            Err(AppError::NotFound(_))
        ));

        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        manager.register(Some("P1".to_string()), tx);
        assert_eq!(handle_test_notification(&manager, "p1").unwrap(), 1);
        match rx.try_recv().unwrap() {
            ServerMessage::DrawNotification { notice } => assert_eq!(notice.reg, "P1"),
            other => panic!("unexpected message {other:?}"),
        }
    }
}
