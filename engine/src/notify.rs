//! Draw-notification planning.
//!
//! When a round's draw is written, players are told where and when they tee
//! off. The first publish notifies every player in every group; later edits
//! notify only players who are new to the draw or whose tee or tee time
//! changed. Delivery itself belongs to the caller.

use crate::shape::key_string;
use crate::RoundId;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Placeholder for a tee or tee time that has not been set.
pub const TBA: &str = "TBA";

/// Separator between the tournament id and the round suffix in round ids.
const ROUND_SEPARATOR: &str = "_round_";

/// Tournament id encoded in a round id (`"T0001_round_2"` → `"T0001"`).
pub fn tournament_id_of_round(round_id: &str) -> &str {
    round_id
        .split_once(ROUND_SEPARATOR)
        .map(|(tournament, _)| tournament)
        .unwrap_or(round_id)
}

/// Where and when one player tees off.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeeAssignment {
    pub reg: String,
    pub name: String,
    pub starting_tee: String,
    pub tee_time: String,
}

/// Whether a draw is being published for the first time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrawChange {
    InitialPublish,
    Update,
}

/// Who to notify about one draw write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPlan {
    pub round_id: RoundId,
    pub tournament_id: String,
    pub change: DrawChange,
    pub recipients: Vec<TeeAssignment>,
}

/// A rendered notification for one recipient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawNotice {
    pub reg: String,
    pub title: String,
    pub body: String,
    pub round_id: RoundId,
    pub tournament_id: String,
    pub starting_tee: String,
    pub tee_time: String,
    pub is_update: bool,
}

impl NotificationPlan {
    pub fn is_empty(&self) -> bool {
        self.recipients.is_empty()
    }

    /// Render the notice sent to one recipient.
    pub fn notice_for(&self, assignment: &TeeAssignment, tournament_name: &str) -> DrawNotice {
        let verb = match self.change {
            DrawChange::InitialPublish => "Published",
            DrawChange::Update => "Updated",
        };
        DrawNotice {
            reg: assignment.reg.clone(),
            title: format!("Draw List {verb}"),
            body: format!(
                "{tournament_name}: You tee off from {} at {}. Tap to view full draw list.",
                assignment.starting_tee, assignment.tee_time
            ),
            round_id: self.round_id.clone(),
            tournament_id: self.tournament_id.clone(),
            starting_tee: assignment.starting_tee.clone(),
            tee_time: assignment.tee_time.clone(),
            is_update: self.change == DrawChange::Update,
        }
    }
}

fn first_text(obj: &Value, fields: &[&str]) -> Option<String> {
    fields
        .iter()
        .filter_map(|f| obj.get(*f))
        .find_map(key_string)
}

/// Every player in every group of a draw, with their group's tee and time.
///
/// Players without a registration number are skipped.
pub fn extract_assignments(draw: &Value) -> Vec<TeeAssignment> {
    let Some(groups) = draw.get("groups").and_then(Value::as_array) else {
        return Vec::new();
    };

    let mut assignments = Vec::new();
    for group in groups {
        let Some(players) = group.get("players").and_then(Value::as_array) else {
            continue;
        };
        let starting_tee =
            first_text(group, &["startingTee", "tee"]).unwrap_or_else(|| TBA.to_string());
        let tee_time = first_text(group, &["teeTime", "time"]).unwrap_or_else(|| TBA.to_string());

        for player in players {
            let Some(reg) = first_text(player, &["reg", "regNo"]) else {
                continue;
            };
            assignments.push(TeeAssignment {
                reg,
                name: first_text(player, &["name"]).unwrap_or_default(),
                starting_tee: starting_tee.clone(),
                tee_time: tee_time.clone(),
            });
        }
    }
    assignments
}

/// Decide who to notify after a draw write.
///
/// Returns `None` when the draw was deleted.
pub fn plan_notifications(
    round_id: &str,
    before: Option<&Value>,
    after: Option<&Value>,
) -> Option<NotificationPlan> {
    let after = after.filter(|v| v.is_object())?;
    let previous = before.filter(|b| b.get("publishedAt").is_some_and(|p| !p.is_null()));

    let (change, recipients) = match previous {
        None => (DrawChange::InitialPublish, extract_assignments(after)),
        Some(before) => {
            let before: BTreeMap<String, TeeAssignment> = extract_assignments(before)
                .into_iter()
                .map(|a| (a.reg.clone(), a))
                .collect();
            let changed = extract_assignments(after)
                .into_iter()
                .filter(|a| match before.get(&a.reg) {
                    None => true,
                    Some(prev) => prev.starting_tee != a.starting_tee || prev.tee_time != a.tee_time,
                })
                .collect();
            (DrawChange::Update, changed)
        }
    };

    Some(NotificationPlan {
        round_id: round_id.to_string(),
        tournament_id: tournament_id_of_round(round_id).to_string(),
        change,
        recipients,
    })
}
