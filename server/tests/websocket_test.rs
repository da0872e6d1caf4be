//! Tests for the WebSocket protocol and draw-notification planning.

use fairway_engine::{plan_notifications, CollectionName, DrawChange, DrawNotice};
use serde_json::{json, Value};

/// Client-side mirror of the server's outgoing messages.
#[derive(Debug, serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ServerMessage {
    Changed {
        collection: CollectionName,
        value: Value,
    },
    DrawNotification {
        notice: DrawNotice,
    },
    Pong,
    Error {
        message: String,
        request_id: Option<String>,
    },
}

fn published_draw(groups: Value) -> Value {
    json!({ "publishedAt": 1_706_745_600_000u64, "groups": groups })
}

#[cfg(test)]
mod websocket_protocol_tests {
    use super::*;

    #[test]
    fn test_changed_message_deserialization() {
        let json = r#"{
            "type": "changed",
            "collection": "admittedPlayers",
            "value": {"T1_round_1": ["P1", "P2"]}
        }"#;

        match serde_json::from_str::<ServerMessage>(json).unwrap() {
            ServerMessage::Changed { collection, value } => {
                assert_eq!(collection, CollectionName::AdmittedPlayers);
                assert_eq!(value["T1_round_1"], json!(["P1", "P2"]));
            }
            other => panic!("Expected Changed message, got {other:?}"),
        }
    }

    #[test]
    fn test_deleted_document_changes_to_null() {
        let json = r#"{"type": "changed", "collection": "draws", "value": null}"#;
        match serde_json::from_str::<ServerMessage>(json).unwrap() {
            ServerMessage::Changed { value, .. } => assert!(value.is_null()),
            other => panic!("Expected Changed message, got {other:?}"),
        }
    }

    #[test]
    fn test_error_and_pong() {
        let msg: ServerMessage =
            serde_json::from_str(r#"{"type": "error", "message": "boom", "request_id": "r1"}"#)
                .unwrap();
        match msg {
            ServerMessage::Error {
                message,
                request_id,
            } => {
                assert_eq!(message, "boom");
                assert_eq!(request_id.as_deref(), Some("r1"));
            }
            other => panic!("Expected Error message, got {other:?}"),
        }

        let msg: ServerMessage = serde_json::from_str(r#"{"type": "pong"}"#).unwrap();
        assert!(matches!(msg, ServerMessage::Pong));
    }

    #[test]
    fn test_subscribe_request_serialization() {
        let request = json!({"type": "subscribe", "collection": CollectionName::Scores});
        assert_eq!(
            serde_json::to_string(&request).unwrap(),
            r#"{"collection":"scores","type":"subscribe"}"#
        );
    }
}

#[cfg(test)]
mod draw_notification_tests {
    use super::*;

    #[test]
    fn test_draw_notification_round_trip() {
        let after = published_draw(json!([
            {"startingTee": "10", "teeTime": "08:20", "players": [{"reg": "P4626", "name": "Ada"}]}
        ]));
        let plan = plan_notifications("KLA-T0001_round_1", None, Some(&after)).unwrap();
        let notice = plan.notice_for(&plan.recipients[0], "Spring Cup");

        let wire = json!({"type": "draw_notification", "notice": notice});
        match serde_json::from_value::<ServerMessage>(wire).unwrap() {
            ServerMessage::DrawNotification { notice } => {
                assert_eq!(notice.reg, "P4626");
                assert_eq!(notice.tournament_id, "KLA-T0001");
                assert_eq!(notice.title, "Draw List Published");
                assert_eq!(
                    notice.body,
                    "Spring Cup: You tee off from 10 at 08:20. Tap to view full draw list."
                );
            }
            other => panic!("Expected DrawNotification, got {other:?}"),
        }
    }

    #[test]
    fn test_moving_a_group_notifies_only_its_players() {
        let before = published_draw(json!([
            {"startingTee": "1", "teeTime": "08:00", "players": [{"reg": "P1"}, {"reg": "P2"}]},
            {"startingTee": "1", "teeTime": "08:10", "players": [{"reg": "P3"}]}
        ]));
        let after = published_draw(json!([
            {"startingTee": "1", "teeTime": "08:00", "players": [{"reg": "P1"}, {"reg": "P2"}]},
            {"startingTee": "10", "teeTime": "08:10", "players": [{"reg": "P3"}]}
        ]));

        let plan = plan_notifications("T1_round_2", Some(&before), Some(&after)).unwrap();
        assert_eq!(plan.change, DrawChange::Update);
        assert_eq!(plan.recipients.len(), 1);
        assert_eq!(plan.recipients[0].reg, "P3");
        assert_eq!(plan.recipients[0].starting_tee, "10");
    }

    #[test]
    fn test_unchanged_republish_notifies_nobody() {
        let draw = published_draw(json!([
            {"startingTee": "1", "teeTime": "08:00", "players": [{"reg": "P1"}]}
        ]));
        let plan = plan_notifications("T1_round_1", Some(&draw), Some(&draw)).unwrap();
        assert!(plan.is_empty());
    }

    #[test]
    fn test_plan_serializes_for_history() {
        let after = published_draw(json!([{"players": [{"regNo": "P9"}]}]));
        let plan = plan_notifications("T2_round_3", None, Some(&after)).unwrap();
        let value = serde_json::to_value(&plan).unwrap();
        assert_eq!(value["change"], "initial_publish");
        assert_eq!(value["tournamentId"], "T2");
        assert_eq!(value["recipients"][0]["startingTee"], "TBA");
    }
}
