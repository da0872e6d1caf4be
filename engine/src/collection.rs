//! The catalogue of synced collections.
//!
//! Six named collections make up a tournament database. Each has a fixed
//! storage name (used both as the local key and the remote path) and a
//! canonical in-memory shape.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;

/// Local key holding the signed-in principal. Device-specific, never synced.
pub const CURRENT_USER_KEY: &str = "currentUser";

/// Canonical in-memory shape of a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionKind {
    /// Ordered list of records
    Sequence,
    /// Mapping from round id to round data
    Mapping,
}

/// One of the six synced collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CollectionName {
    Courses,
    Players,
    Tournaments,
    Scores,
    Draws,
    AdmittedPlayers,
}

impl CollectionName {
    /// Every collection, in load order.
    pub const ALL: [CollectionName; 6] = [
        CollectionName::Courses,
        CollectionName::Players,
        CollectionName::Tournaments,
        CollectionName::Scores,
        CollectionName::Draws,
        CollectionName::AdmittedPlayers,
    ];

    /// Collections whose presence means the device already holds a roster.
    pub const ROSTER: [CollectionName; 3] = [
        CollectionName::Tournaments,
        CollectionName::Players,
        CollectionName::Courses,
    ];

    /// Storage name, shared by the local key and the remote path.
    pub fn as_str(&self) -> &'static str {
        match self {
            CollectionName::Courses => "courses",
            CollectionName::Players => "players",
            CollectionName::Tournaments => "tournaments",
            CollectionName::Scores => "scores",
            CollectionName::Draws => "draws",
            CollectionName::AdmittedPlayers => "admittedPlayers",
        }
    }

    pub fn kind(&self) -> CollectionKind {
        match self {
            CollectionName::Courses | CollectionName::Players | CollectionName::Tournaments => {
                CollectionKind::Sequence
            }
            CollectionName::Scores | CollectionName::Draws | CollectionName::AdmittedPlayers => {
                CollectionKind::Mapping
            }
        }
    }

    /// Field that keys records of this collection in its remote mapping form.
    ///
    /// Courses have no stable id and are stored positionally.
    pub fn natural_key(&self) -> Option<&'static str> {
        match self {
            CollectionName::Players => Some("reg"),
            CollectionName::Tournaments => Some("tournamentId"),
            _ => None,
        }
    }

    /// Whether natural keys are stored uppercased.
    pub fn uppercase_keys(&self) -> bool {
        matches!(self, CollectionName::Players)
    }

    /// Empty default for this collection's canonical shape.
    pub fn empty_value(&self) -> Value {
        match self.kind() {
            CollectionKind::Sequence => json!([]),
            CollectionKind::Mapping => json!({}),
        }
    }
}

impl fmt::Display for CollectionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CollectionName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        CollectionName::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| Error::UnknownCollection(s.to_string()))
    }
}

/// Strip the club prefix from a tournament id for display.
///
/// `"KLA-T0001"` becomes `"T0001"`; ids without a prefix are returned as-is.
pub fn display_tournament_id(tournament_id: &str) -> &str {
    if tournament_id.is_empty() {
        return "-";
    }
    match tournament_id.split('-').nth(1) {
        Some(rest) => rest,
        None => tournament_id,
    }
}
