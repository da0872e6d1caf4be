//! Score entries and their completeness measure.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// One player's scorecard for one round.
///
/// Only `holes` is interpreted; every other field is carried through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreEntry {
    /// Strokes per hole. Unplayed holes are `""` or `null`.
    #[serde(
        default,
        deserialize_with = "holes_from_any_shape",
        skip_serializing_if = "Option::is_none"
    )]
    pub holes: Option<Vec<Value>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ScoreEntry {
    pub fn new(holes: Vec<Value>) -> Self {
        Self {
            holes: Some(holes),
            extra: Map::new(),
        }
    }

    /// Parse an entry; anything but a JSON object is rejected.
    pub fn from_value(value: Value) -> Option<Self> {
        if !value.is_object() {
            return None;
        }
        serde_json::from_value(value).ok()
    }

    pub fn into_value(self) -> Value {
        let mut map = self.extra;
        if let Some(holes) = self.holes {
            map.insert("holes".to_string(), Value::Array(holes));
        }
        Value::Object(map)
    }

    /// Number of recorded holes: entries that are neither `null` nor `""`.
    pub fn completeness(&self) -> usize {
        self.holes
            .iter()
            .flatten()
            .filter(|h| !matches!(h, Value::Null) && h.as_str() != Some(""))
            .count()
    }
}

/// Highest hole index accepted from a sparse hole object.
pub const MAX_HOLE_INDEX: usize = 63;

// Sparse hole lists come back from the remote store as index-keyed objects.
fn holes_from_any_shape<'de, D>(deserializer: D) -> Result<Option<Vec<Value>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(match raw {
        None | Some(Value::Null) => None,
        Some(Value::Object(map)) => {
            let mut indexed: Vec<(usize, Value)> = map
                .into_iter()
                .filter_map(|(k, v)| match k.parse::<usize>() {
                    Ok(i) if i <= MAX_HOLE_INDEX => Some((i, v)),
                    Ok(_) => {
                        tracing::warn!(index = %k, "hole index out of range, dropping");
                        None
                    }
                    Err(_) => None,
                })
                .collect();
            indexed.sort_by_key(|(i, _)| *i);
            let len = indexed.last().map(|(i, _)| i + 1).unwrap_or(0);
            let mut holes = vec![Value::Null; len];
            for (i, v) in indexed {
                holes[i] = v;
            }
            Some(holes)
        }
        Some(Value::Array(holes)) => Some(holes),
        Some(_) => None,
    })
}
