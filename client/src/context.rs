//! The sync context: a device's local store plus its optional remote.
//!
//! Loading merges each collection's remote copy into the local one;
//! saving overwrites locally and then remotely without merging. Remote
//! failures never lose local data: fetch failures degrade that collection
//! to local-only and push failures come back as warnings.

use std::sync::Arc;

use fairway_engine::{
    merge_player_lookup, normalize_records, remote_form, unkeyed_count, Canonical, CollectionName,
    KeyValueBackend, LocalStore, Reconciler,
};
use futures::future::join_all;
use serde_json::Value;

use crate::config::ClientConfig;
use crate::error::{RemoteError, SyncError};
use crate::file_backend::FileBackend;
use crate::remote::{HttpRemote, RemoteStore};

/// How the remote side of a load went.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteFetch {
    /// Cloud sync is disabled
    Disabled,
    /// Remote data (possibly none) was merged
    Merged,
    /// The fetch failed; the local snapshot was kept unmerged
    Failed(String),
}

/// Outcome of a best-effort remote write.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteStatus {
    /// Nothing needed pushing, or sync is disabled
    Skipped,
    Pushed,
    /// The push failed; local data is intact. Carries a user-facing warning.
    Failed(String),
}

impl RemoteStatus {
    pub fn warning(&self) -> Option<&str> {
        match self {
            RemoteStatus::Failed(warning) => Some(warning),
            _ => None,
        }
    }
}

/// Result of loading one collection.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadOutcome {
    pub collection: CollectionName,
    /// The collection as now stored locally
    pub value: Value,
    pub fetch: RemoteFetch,
    pub push_back: RemoteStatus,
}

/// A device's sync state, constructed explicitly and torn down by the caller.
#[derive(Debug)]
pub struct SyncContext<B, R> {
    store: Arc<LocalStore<B>>,
    remote: Option<Arc<R>>,
    reconciler: Reconciler,
}

/// The context a real device runs with.
pub type DeviceContext = SyncContext<FileBackend, HttpRemote>;

impl DeviceContext {
    /// Open the local store under the configured data directory and, when a
    /// server URL is configured, the remote.
    ///
    /// The stored session token is used unless the configuration overrides it.
    pub fn init(config: &ClientConfig) -> Result<Self, SyncError> {
        let backend = FileBackend::open(&config.data_dir)?;
        let token = match &config.token {
            Some(token) => Some(token.clone()),
            None => backend.get(crate::identity::SESSION_TOKEN_KEY)?,
        };

        let remote = config
            .server_url
            .as_ref()
            .map(|url| Arc::new(HttpRemote::new(url.clone(), token)));

        tracing::info!(
            data_dir = %config.data_dir.display(),
            sync_enabled = remote.is_some(),
            "sync context initialized"
        );

        Ok(Self::new(
            LocalStore::new(backend),
            remote,
            Reconciler::new(config.tie_break),
        ))
    }
}

impl<B: KeyValueBackend, R: RemoteStore> SyncContext<B, R> {
    pub fn new(store: LocalStore<B>, remote: Option<Arc<R>>, reconciler: Reconciler) -> Self {
        Self {
            store: Arc::new(store),
            remote,
            reconciler,
        }
    }

    /// Release the context. Nothing is buffered, so this only logs.
    pub fn teardown(self) {
        tracing::info!(sync_enabled = self.sync_enabled(), "sync context torn down");
    }

    pub fn store(&self) -> &Arc<LocalStore<B>> {
        &self.store
    }

    pub fn remote(&self) -> Option<&Arc<R>> {
        self.remote.as_ref()
    }

    pub fn sync_enabled(&self) -> bool {
        self.remote.is_some()
    }

    /// Fetch one collection, merge it into the local copy, persist the
    /// result, and push it back if the local side held data the remote lacked.
    pub async fn load_collection(&self, collection: CollectionName) -> LoadOutcome {
        let local = self.store.read(collection);

        let Some(remote) = &self.remote else {
            return LoadOutcome {
                collection,
                value: local,
                fetch: RemoteFetch::Disabled,
                push_back: RemoteStatus::Skipped,
            };
        };

        let fetched = match remote.fetch(collection).await {
            Ok(fetched) => fetched,
            Err(e) => {
                tracing::warn!(collection = %collection, "remote fetch failed, using local data: {}", e);
                return LoadOutcome {
                    collection,
                    value: local,
                    fetch: RemoteFetch::Failed(e.to_string()),
                    push_back: RemoteStatus::Skipped,
                };
            }
        };

        let reconciled = self.reconciler.reconcile(collection, local, fetched);
        if let Err(e) = self.store.write(collection, &reconciled.merged) {
            tracing::error!(collection = %collection, "failed to persist merged collection: {}", e);
        }

        let push_back = if reconciled.needs_push_back() {
            warn_unkeyed(collection, &reconciled.merged);
            let pushed = remote_form(collection, reconciled.merged.clone());
            push_status(collection, remote.push(collection, &pushed).await)
        } else {
            RemoteStatus::Skipped
        };

        LoadOutcome {
            collection,
            value: reconciled.merged,
            fetch: RemoteFetch::Merged,
            push_back,
        }
    }

    /// Load all six collections concurrently.
    pub async fn load_all(&self) -> Vec<LoadOutcome> {
        join_all(CollectionName::ALL.map(|c| self.load_collection(c))).await
    }

    /// Overwrite a collection locally, then remotely. No merge.
    ///
    /// Only a local write failure is an error; a failed push is reported in
    /// the returned status.
    pub async fn save(
        &self,
        collection: CollectionName,
        value: Value,
    ) -> Result<RemoteStatus, SyncError> {
        let canonical = Canonical::normalize(collection, Some(value)).into_value();
        self.store.write(collection, &canonical)?;

        let Some(remote) = &self.remote else {
            return Ok(RemoteStatus::Skipped);
        };
        warn_unkeyed(collection, &canonical);
        let pushed = remote_form(collection, canonical);
        Ok(push_status(collection, remote.push(collection, &pushed).await))
    }

    /// Push every local collection to the remote.
    ///
    /// All pushes are attempted; the first failure is returned.
    pub async fn sync_all(&self) -> Result<Vec<CollectionName>, SyncError> {
        let remote = self.remote.as_ref().ok_or(SyncError::NotConnected)?;

        let pushes = CollectionName::ALL.map(|collection| {
            let value = remote_form(collection, self.store.read(collection));
            async move { (collection, remote.push(collection, &value).await) }
        });

        let mut pushed = Vec::new();
        let mut first_error = None;
        for (collection, result) in join_all(pushes).await {
            match result {
                Ok(()) => pushed.push(collection),
                Err(e) => {
                    tracing::error!(collection = %collection, "manual sync push failed: {}", e);
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(SyncError::Remote(e)),
            None => {
                tracing::info!(collections = pushed.len(), "all collections synced");
                Ok(pushed)
            }
        }
    }

    /// Bootstrap a new device.
    ///
    /// When no local roster data exists but the remote has some, every
    /// collection is copied down (normalized, without merging). Returns
    /// whether anything was loaded.
    pub async fn auto_load_if_empty(&self) -> bool {
        let Some(remote) = &self.remote else {
            return false;
        };
        if self.store.has_roster_data() {
            return false;
        }

        tracing::info!("local roster is empty, checking remote for data");
        match self.copy_down(remote.as_ref()).await {
            Ok(loaded) => loaded,
            Err(e) => {
                tracing::error!("auto-load failed: {}", e);
                false
            }
        }
    }

    async fn copy_down(&self, remote: &R) -> Result<bool, SyncError> {
        let fetched: Vec<(CollectionName, Option<Value>)> =
            join_all(CollectionName::ALL.map(|c| async move { (c, remote.fetch(c).await) }))
                .await
                .into_iter()
                .map(|(c, result)| result.map(|value| (c, value)))
                .collect::<Result<_, RemoteError>>()?;

        let normalized: Vec<(CollectionName, Canonical)> = fetched
            .into_iter()
            .map(|(c, value)| (c, Canonical::normalize(c, value)))
            .collect();

        let remote_has_roster = normalized
            .iter()
            .any(|(c, canonical)| CollectionName::ROSTER.contains(c) && !canonical.is_empty());
        if !remote_has_roster {
            return Ok(false);
        }

        for (collection, canonical) in normalized {
            self.store.write(collection, &canonical.into_value())?;
        }
        tracing::info!("auto-loaded all collections from remote");
        Ok(true)
    }

    /// Look up a player by registration number, preferring remote fields
    /// and filling gaps from the local copy.
    pub async fn find_player(&self, reg: &str) -> Option<Value> {
        let local = self.store.find_player(reg);

        let remote = match &self.remote {
            Some(remote) => match remote.fetch(CollectionName::Players).await {
                Ok(players) => {
                    let wanted = reg.to_uppercase();
                    normalize_records(CollectionName::Players, players)
                        .into_iter()
                        .find(|p| {
                            p.get("reg")
                                .and_then(Value::as_str)
                                .is_some_and(|r| r.to_uppercase() == wanted)
                        })
                }
                Err(e) => {
                    tracing::warn!(reg = %reg, "remote player lookup failed: {}", e);
                    None
                }
            },
            None => None,
        };

        merge_player_lookup(local, remote)
    }
}

fn warn_unkeyed(collection: CollectionName, local: &Value) {
    let unkeyed = unkeyed_count(collection, local);
    if unkeyed > 0 {
        tracing::warn!(collection = %collection, unkeyed, "records without a key stay local only");
    }
}

fn push_status(collection: CollectionName, result: Result<(), RemoteError>) -> RemoteStatus {
    match result {
        Ok(()) => RemoteStatus::Pushed,
        Err(e) => {
            tracing::error!(collection = %collection, "remote push failed: {}", e);
            RemoteStatus::Failed(format!(
                "Saved locally, but syncing {collection} to the cloud failed: {e}"
            ))
        }
    }
}
