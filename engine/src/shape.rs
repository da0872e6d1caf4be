//! Shape normalization for collection payloads.
//!
//! A collection may arrive as a legacy ordered sequence or as a keyed
//! mapping, and either may contain `null` holes left behind by remote
//! deletions. Every ingress boundary turns the raw JSON into a [`Shape`] and
//! from there into the collection's [`Canonical`] form. Nothing downstream
//! inspects raw JSON shapes again.

use crate::score::ScoreEntry;
use crate::{CollectionName, PlayerId, RoundId};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Scores keyed by round, then by player.
pub type ScoreBook = BTreeMap<RoundId, BTreeMap<PlayerId, ScoreEntry>>;

/// Draw documents keyed by round. Draws are replaced whole, never merged by field.
pub type DrawBook = BTreeMap<RoundId, Map<String, Value>>;

/// Admitted player ids keyed by round.
pub type AdmittedBook = BTreeMap<RoundId, Vec<PlayerId>>;

/// A raw collection payload, tagged by its container type.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    /// `null`, missing, or a scalar where a container was expected
    Absent,
    /// Legacy ordered form
    Sequence(Vec<Value>),
    /// Keyed form
    Mapping(Map<String, Value>),
}

impl Shape {
    /// Tag a raw value. Anything that is not an array or object is absent.
    pub fn ingest(value: Option<Value>) -> Self {
        match value {
            Some(Value::Array(items)) => Shape::Sequence(items),
            Some(Value::Object(map)) => Shape::Mapping(map),
            _ => Shape::Absent,
        }
    }

    /// Records in order, with `null` holes removed.
    ///
    /// Mapping values are taken in key order.
    pub fn into_records(self) -> Vec<Value> {
        match self {
            Shape::Absent => Vec::new(),
            Shape::Sequence(items) => items.into_iter().filter(|v| !v.is_null()).collect(),
            Shape::Mapping(map) => map
                .into_iter()
                .collect::<BTreeMap<_, _>>()
                .into_values()
                .filter(|v| !v.is_null())
                .collect(),
        }
    }

    /// Keyed entries with `null` values removed.
    ///
    /// A legacy sequence is keyed by position, skipping `null` slots.
    pub fn into_entries(self) -> BTreeMap<String, Value> {
        match self {
            Shape::Absent => BTreeMap::new(),
            Shape::Sequence(items) => items
                .into_iter()
                .enumerate()
                .filter(|(_, v)| !v.is_null())
                .map(|(i, v)| (i.to_string(), v))
                .collect(),
            Shape::Mapping(map) => map.into_iter().filter(|(_, v)| !v.is_null()).collect(),
        }
    }
}

/// Render a key-like JSON value as a string key.
pub(crate) fn key_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Split records into those keyed by `field` and those without a usable key.
///
/// When `uppercase` is set, both the key and the record's own field are
/// uppercased. A later record with the same key replaces an earlier one.
/// Unkeyed records keep their relative order.
pub fn split_keyed(
    records: Vec<Value>,
    field: &str,
    uppercase: bool,
) -> (BTreeMap<String, Value>, Vec<Value>) {
    let mut keyed = BTreeMap::new();
    let mut unkeyed = Vec::new();
    for mut record in records {
        let Some(mut key) = record.get(field).and_then(key_string) else {
            unkeyed.push(record);
            continue;
        };
        if uppercase {
            key = key.to_uppercase();
            if let Some(obj) = record.as_object_mut() {
                obj.insert(field.to_string(), Value::String(key.clone()));
            }
        }
        keyed.insert(key, record);
    }
    (keyed, unkeyed)
}

/// Key records by `field`, dropping records without a usable key.
pub fn key_records(records: Vec<Value>, field: &str, uppercase: bool) -> BTreeMap<String, Value> {
    let (keyed, unkeyed) = split_keyed(records, field, uppercase);
    if !unkeyed.is_empty() {
        tracing::warn!(field, dropped = unkeyed.len(), "dropping records without a key");
    }
    keyed
}

/// A collection in its canonical in-memory form.
#[derive(Debug, Clone, PartialEq)]
pub enum Canonical {
    /// Courses, players, tournaments
    Records(Vec<Value>),
    Scores(ScoreBook),
    Draws(DrawBook),
    Admitted(AdmittedBook),
}

impl Canonical {
    /// Normalize a raw payload for `collection`.
    pub fn normalize(collection: CollectionName, raw: Option<Value>) -> Self {
        match collection {
            CollectionName::Courses | CollectionName::Players | CollectionName::Tournaments => {
                Canonical::Records(normalize_records(collection, raw))
            }
            CollectionName::Scores => Canonical::Scores(normalize_scores(raw)),
            CollectionName::Draws => Canonical::Draws(normalize_draws(raw)),
            CollectionName::AdmittedPlayers => Canonical::Admitted(normalize_admitted(raw)),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Canonical::Records(r) => r.is_empty(),
            Canonical::Scores(s) => s.is_empty(),
            Canonical::Draws(d) => d.is_empty(),
            Canonical::Admitted(a) => a.is_empty(),
        }
    }

    /// The local (canonical) JSON representation.
    pub fn into_value(self) -> Value {
        match self {
            Canonical::Records(records) => Value::Array(records),
            Canonical::Scores(book) => Value::Object(
                book.into_iter()
                    .map(|(round, players)| {
                        let players: Map<String, Value> = players
                            .into_iter()
                            .map(|(id, entry)| (id, entry.into_value()))
                            .collect();
                        (round, Value::Object(players))
                    })
                    .collect(),
            ),
            Canonical::Draws(book) => Value::Object(
                book.into_iter()
                    .map(|(round, draw)| (round, Value::Object(draw)))
                    .collect(),
            ),
            Canonical::Admitted(book) => Value::Object(
                book.into_iter()
                    .map(|(round, ids)| {
                        (round, Value::Array(ids.into_iter().map(Value::String).collect()))
                    })
                    .collect(),
            ),
        }
    }
}

/// Convert a local value into the representation stored remotely.
///
/// Players and tournaments are pushed as id-keyed mappings; every other
/// collection is pushed in its canonical form. Records without a natural
/// key cannot be keyed and stay local only (see [`unkeyed_count`]).
pub fn remote_form(collection: CollectionName, local: Value) -> Value {
    let canonical = Canonical::normalize(collection, Some(local));
    match (collection.natural_key(), canonical) {
        (Some(field), Canonical::Records(records)) => Value::Object(
            key_records(records, field, collection.uppercase_keys())
                .into_iter()
                .collect(),
        ),
        (_, canonical) => canonical.into_value(),
    }
}

/// Number of records in a local value that [`remote_form`] cannot key.
pub fn unkeyed_count(collection: CollectionName, local: &Value) -> usize {
    let Some(field) = collection.natural_key() else {
        return 0;
    };
    match local {
        Value::Array(records) => records
            .iter()
            .filter(|r| !r.is_null() && r.get(field).and_then(key_string).is_none())
            .count(),
        _ => 0,
    }
}

/// Records of a sequence-shaped collection.
///
/// Players and tournaments are deduplicated and ordered by natural key, so
/// a legacy sequence and a keyed mapping holding the same records normalize
/// identically. Records without a key follow the keyed ones in their
/// original order. Courses keep their positional order.
pub fn normalize_records(collection: CollectionName, raw: Option<Value>) -> Vec<Value> {
    let records = Shape::ingest(raw).into_records();
    match collection.natural_key() {
        Some(field) => {
            let (keyed, unkeyed) = split_keyed(records, field, collection.uppercase_keys());
            keyed.into_values().chain(unkeyed).collect()
        }
        None => records,
    }
}

pub fn normalize_scores(raw: Option<Value>) -> ScoreBook {
    Shape::ingest(raw)
        .into_entries()
        .into_iter()
        .filter_map(|(round, players)| {
            let players = Shape::ingest(Some(players));
            if players == Shape::Absent {
                return None;
            }
            let players: BTreeMap<_, _> = players
                .into_entries()
                .into_iter()
                .filter_map(|(player, raw)| match ScoreEntry::from_value(raw) {
                    Some(entry) => Some((player, entry)),
                    None => {
                        tracing::warn!(round = %round, player = %player, "dropping malformed score entry");
                        None
                    }
                })
                .collect();
            Some((round, players))
        })
        .collect()
}

pub fn normalize_draws(raw: Option<Value>) -> DrawBook {
    Shape::ingest(raw)
        .into_entries()
        .into_iter()
        .filter_map(|(round, draw)| match draw {
            Value::Object(map) => Some((round, map)),
            _ => None,
        })
        .collect()
}

pub fn normalize_admitted(raw: Option<Value>) -> AdmittedBook {
    Shape::ingest(raw)
        .into_entries()
        .into_iter()
        .filter_map(|(round, ids)| {
            let ids = match &ids {
                Value::Array(_) | Value::Object(_) => Shape::ingest(Some(ids))
                    .into_records()
                    .iter()
                    .filter_map(key_string)
                    .collect(),
                _ => return None,
            };
            Some((round, ids))
        })
        .collect()
}
