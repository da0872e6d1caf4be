//! Reconciliation of a local collection snapshot with its remote copy.
//!
//! Both sides are normalized to the collection's canonical form first, so
//! the merge rules never compare a legacy sequence against a keyed mapping.
//!
//! # Rules
//!
//! - **courses, players, tournaments**: a non-empty remote replaces local
//!   wholesale; otherwise local is kept.
//! - **scores**: per round, per player, the side with the more complete
//!   scorecard wins. Ties go to the [`TieBreak`] policy.
//! - **draws**: per round, a remote draw document replaces the local one.
//! - **admittedPlayers**: per round, the remote list replaces the local list
//!   when the local list is empty or shorter.
//!
//! For every rule, keys held locally but absent remotely are kept and
//! reported in [`ReconcileReport::missing_remotely`], which schedules a
//! push-back of the merged snapshot.

use crate::shape::{self, AdmittedBook, Canonical, DrawBook, ScoreBook};
use crate::CollectionName;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Which scorecard survives when both sides are equally complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TieBreak {
    /// Keep the local entry (default)
    #[default]
    PreferLocal,
    /// Take the remote entry
    PreferRemote,
}

/// What the merge did, by key.
///
/// Keys are round ids for mapping collections, `round/player` pairs for
/// scores, natural keys for players and tournaments, and positions for
/// courses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileReport {
    /// Keys where the remote value was taken
    pub applied_remote: Vec<String>,
    /// Keys present on both sides where the local value was kept
    pub kept_local: Vec<String>,
    /// Keys present locally but absent remotely
    pub missing_remotely: Vec<String>,
}

impl ReconcileReport {
    /// Whether the merged snapshot should be pushed back to the remote store.
    pub fn needs_push_back(&self) -> bool {
        !self.missing_remotely.is_empty()
    }
}

/// Result of reconciling one collection.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciled {
    pub collection: CollectionName,
    /// Merged snapshot in canonical local form
    pub merged: Value,
    pub report: ReconcileReport,
}

impl Reconciled {
    pub fn needs_push_back(&self) -> bool {
        self.report.needs_push_back()
    }
}

/// Merges local and remote snapshots using per-collection rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct Reconciler {
    tie_break: TieBreak,
}

impl Reconciler {
    pub fn new(tie_break: TieBreak) -> Self {
        Self { tie_break }
    }

    pub fn tie_break(&self) -> TieBreak {
        self.tie_break
    }

    /// Reconcile `local` with `remote` for `collection`.
    ///
    /// A `remote` of `None` (nothing stored remotely yet) behaves exactly
    /// like an empty remote snapshot.
    pub fn reconcile(
        &self,
        collection: CollectionName,
        local: Value,
        remote: Option<Value>,
    ) -> Reconciled {
        let local = Some(local);
        let (merged, report) = match collection {
            CollectionName::Courses | CollectionName::Players | CollectionName::Tournaments => {
                let (m, r) = merge_records(
                    collection,
                    shape::normalize_records(collection, local),
                    shape::normalize_records(collection, remote),
                );
                (Canonical::Records(m), r)
            }
            CollectionName::Scores => {
                let (m, r) = merge_scores(
                    shape::normalize_scores(local),
                    shape::normalize_scores(remote),
                    self.tie_break,
                );
                (Canonical::Scores(m), r)
            }
            CollectionName::Draws => {
                let (m, r) =
                    merge_draws(shape::normalize_draws(local), shape::normalize_draws(remote));
                (Canonical::Draws(m), r)
            }
            CollectionName::AdmittedPlayers => {
                let (m, r) = merge_admitted(
                    shape::normalize_admitted(local),
                    shape::normalize_admitted(remote),
                );
                (Canonical::Admitted(m), r)
            }
        };

        if report.needs_push_back() {
            tracing::info!(
                collection = %collection,
                missing = report.missing_remotely.len(),
                "local data absent remotely, scheduling push-back"
            );
        }

        Reconciled {
            collection,
            merged: merged.into_value(),
            report,
        }
    }
}

fn record_keys(collection: CollectionName, records: &[Value]) -> Vec<String> {
    match collection.natural_key() {
        Some(field) => records
            .iter()
            .filter_map(|r| r.get(field).and_then(shape::key_string))
            .collect(),
        None => (0..records.len()).map(|i| i.to_string()).collect(),
    }
}

/// Courses, players and tournaments: a non-empty remote replaces local.
///
/// Players and tournaments without a natural key can never be stored
/// remotely, so local ones are carried over after the remote records.
pub fn merge_records(
    collection: CollectionName,
    local: Vec<Value>,
    remote: Vec<Value>,
) -> (Vec<Value>, ReconcileReport) {
    let mut report = ReconcileReport::default();
    if remote.is_empty() {
        report.missing_remotely = record_keys(collection, &local);
        return (local, report);
    }
    report.applied_remote = record_keys(collection, &remote);

    let Some(field) = collection.natural_key() else {
        return (remote, report);
    };
    let mut merged = remote;
    for (i, record) in local.into_iter().enumerate() {
        let unkeyed = record.get(field).and_then(shape::key_string).is_none();
        if unkeyed && !merged.contains(&record) {
            merged.push(record);
            report.kept_local.push(i.to_string());
        }
    }
    (merged, report)
}

/// Scores: keep the more complete scorecard per (round, player).
pub fn merge_scores(
    local: ScoreBook,
    remote: ScoreBook,
    tie_break: TieBreak,
) -> (ScoreBook, ReconcileReport) {
    let mut report = ReconcileReport::default();
    report.missing_remotely = local
        .keys()
        .filter(|round| !remote.contains_key(*round))
        .cloned()
        .collect();

    let mut merged = local;
    for (round_id, remote_round) in remote {
        let local_round = merged.entry(round_id.clone()).or_default();
        for (player_id, remote_entry) in remote_round {
            let key = format!("{round_id}/{player_id}");
            match local_round.get(&player_id) {
                None => {
                    local_round.insert(player_id, remote_entry);
                    report.applied_remote.push(key);
                }
                Some(local_entry) => {
                    let local_count = local_entry.completeness();
                    let remote_count = remote_entry.completeness();
                    let remote_wins = remote_count > local_count
                        || (remote_count == local_count
                            && tie_break == TieBreak::PreferRemote
                            && *local_entry != remote_entry);
                    if remote_wins {
                        local_round.insert(player_id, remote_entry);
                        report.applied_remote.push(key);
                    } else {
                        report.kept_local.push(key);
                    }
                }
            }
        }
    }
    (merged, report)
}

/// Draws: a remote round document replaces the local one whole.
pub fn merge_draws(local: DrawBook, remote: DrawBook) -> (DrawBook, ReconcileReport) {
    let mut report = ReconcileReport::default();
    report.missing_remotely = local
        .keys()
        .filter(|round| !remote.contains_key(*round))
        .cloned()
        .collect();

    let mut merged = local;
    for (round_id, draw) in remote {
        merged.insert(round_id.clone(), draw);
        report.applied_remote.push(round_id);
    }
    (merged, report)
}

/// Admitted players: the remote list wins when the local one is empty or shorter.
pub fn merge_admitted(local: AdmittedBook, remote: AdmittedBook) -> (AdmittedBook, ReconcileReport) {
    let mut report = ReconcileReport::default();
    report.missing_remotely = local
        .keys()
        .filter(|round| !remote.contains_key(*round))
        .cloned()
        .collect();

    let mut merged = local;
    for (round_id, remote_ids) in remote {
        match merged.get(&round_id) {
            Some(local_ids) if !local_ids.is_empty() && local_ids.len() >= remote_ids.len() => {
                report.kept_local.push(round_id);
            }
            _ => {
                merged.insert(round_id.clone(), remote_ids);
                report.applied_remote.push(round_id);
            }
        }
    }
    (merged, report)
}
