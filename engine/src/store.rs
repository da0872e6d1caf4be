//! Local Store Adapter.
//!
//! Wraps a persistent key-value backend holding one JSON text blob per
//! collection. Reads never fail: missing, corrupt, or wrongly shaped blobs
//! come back as the collection's empty default. Writes always replace the
//! whole blob.

use crate::shape::Canonical;
use crate::{CollectionName, Error, Principal, Result, CURRENT_USER_KEY};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::RwLock;

/// A persistent string key-value store.
///
/// Implementations must be safe to share between concurrent loads, hence
/// `&self` receivers.
pub trait KeyValueBackend: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;

    fn set(&self, key: &str, value: String) -> Result<()>;

    fn remove(&self, key: &str) -> Result<()>;
}

/// In-memory backend, for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: RwLock<BTreeMap<String, String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueBackend for MemoryBackend {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self
            .entries
            .read()
            .map_err(|e| Error::Backend(e.to_string()))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: String) -> Result<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|e| Error::Backend(e.to_string()))?;
        entries.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|e| Error::Backend(e.to_string()))?;
        entries.remove(key);
        Ok(())
    }
}

/// Typed access to the six collections and the current user.
#[derive(Debug)]
pub struct LocalStore<B> {
    backend: B,
}

impl<B: KeyValueBackend> LocalStore<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Read a collection in canonical form.
    ///
    /// Falls back to the empty default (and logs) when the blob is missing,
    /// unreadable, or not valid JSON.
    pub fn read(&self, collection: CollectionName) -> Value {
        let raw = match self.backend.get(collection.as_str()) {
            Ok(Some(raw)) => raw,
            Ok(None) => return collection.empty_value(),
            Err(e) => {
                tracing::warn!(collection = %collection, "failed to read local collection: {}", e);
                return collection.empty_value();
            }
        };

        match serde_json::from_str::<Value>(&raw) {
            Ok(value) => Canonical::normalize(collection, Some(value)).into_value(),
            Err(e) => {
                tracing::warn!(collection = %collection, "failed to parse local collection: {}", e);
                collection.empty_value()
            }
        }
    }

    /// Replace a collection's stored value.
    pub fn write(&self, collection: CollectionName, value: &Value) -> Result<()> {
        let text = serde_json::to_string(value)?;
        self.backend.set(collection.as_str(), text)
    }

    /// Whether any of courses, players or tournaments holds data.
    pub fn has_roster_data(&self) -> bool {
        CollectionName::ROSTER.into_iter().any(|c| {
            self.read(c)
                .as_array()
                .map(|records| !records.is_empty())
                .unwrap_or(false)
        })
    }

    /// Find a cached player by registration number, ignoring case.
    pub fn find_player(&self, reg: &str) -> Option<Value> {
        let wanted = reg.to_uppercase();
        let Value::Array(players) = self.read(CollectionName::Players) else {
            return None;
        };
        players.into_iter().find(|p| {
            p.get("reg")
                .and_then(Value::as_str)
                .map(|r| r.to_uppercase() == wanted)
                .unwrap_or(false)
        })
    }

    /// The signed-in principal cached on this device, if any.
    pub fn read_current_user(&self) -> Option<Principal> {
        let raw = match self.backend.get(CURRENT_USER_KEY) {
            Ok(raw) => raw?,
            Err(e) => {
                tracing::warn!("failed to read current user: {}", e);
                return None;
            }
        };
        match serde_json::from_str::<Principal>(&raw) {
            Ok(principal) => Some(principal),
            Err(e) => {
                tracing::warn!("failed to parse current user: {}", e);
                None
            }
        }
    }

    pub fn write_current_user(&self, principal: &Principal) -> Result<()> {
        let text = serde_json::to_string(principal)?;
        self.backend.set(CURRENT_USER_KEY, text)
    }

    pub fn clear_current_user(&self) -> Result<()> {
        self.backend.remove(CURRENT_USER_KEY)
    }
}
