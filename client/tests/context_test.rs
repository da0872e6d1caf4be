//! Sync context and identity client tests against in-memory fakes.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use fairway_client::{
    clear_local_session, IdentityClient, IdentityError, IdentityStore, RemoteError, RemoteFetch, RemoteStatus,
    RemoteStore, Session, SyncContext, SyncError,
};
use fairway_engine::{
    CollectionName, KeyValueBackend, LocalStore, MemoryBackend, Principal, Reconciler, Role,
};
use serde_json::{json, Value};

// ============================================================================
// Fakes
// ============================================================================

#[derive(Default)]
struct FakeRemote {
    documents: Mutex<BTreeMap<CollectionName, Value>>,
    pushes: Mutex<Vec<CollectionName>>,
    fail_fetch: AtomicBool,
    fail_push: AtomicBool,
}

impl FakeRemote {
    fn with(documents: Vec<(CollectionName, Value)>) -> Arc<Self> {
        let remote = Self::default();
        remote.documents.lock().unwrap().extend(documents);
        Arc::new(remote)
    }

    fn stored(&self, collection: CollectionName) -> Option<Value> {
        self.documents.lock().unwrap().get(&collection).cloned()
    }

    fn pushes(&self) -> Vec<CollectionName> {
        self.pushes.lock().unwrap().clone()
    }
}

fn unavailable() -> RemoteError {
    RemoteError::Status {
        status: 503,
        body: "unavailable".into(),
    }
}

impl RemoteStore for FakeRemote {
    async fn fetch(&self, collection: CollectionName) -> Result<Option<Value>, RemoteError> {
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        Ok(self.stored(collection))
    }

    async fn push(&self, collection: CollectionName, value: &Value) -> Result<(), RemoteError> {
        if self.fail_push.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        self.documents
            .lock()
            .unwrap()
            .insert(collection, value.clone());
        self.pushes.lock().unwrap().push(collection);
        Ok(())
    }
}

type TestContext = SyncContext<MemoryBackend, FakeRemote>;

fn context(remote: Option<Arc<FakeRemote>>) -> TestContext {
    SyncContext::new(LocalStore::new(MemoryBackend::new()), remote, Reconciler::default())
}

// ============================================================================
// Load
// ============================================================================

#[tokio::test]
async fn new_device_takes_remote_snapshot() {
    let remote = FakeRemote::with(vec![
        (
            CollectionName::Players,
            json!({"P2": {"reg": "P2"}, "P1": {"reg": "P1"}, "P3": null}),
        ),
        (CollectionName::Scores, json!({"R1": {"P1": {"holes": [4, 5]}}})),
    ]);
    let ctx = context(Some(remote.clone()));

    let outcomes = ctx.load_all().await;
    assert_eq!(outcomes.len(), 6);
    assert!(outcomes.iter().all(|o| o.fetch == RemoteFetch::Merged));
    assert!(outcomes.iter().all(|o| o.push_back == RemoteStatus::Skipped));

    assert_eq!(
        ctx.store().read(CollectionName::Players),
        json!([{"reg": "P1"}, {"reg": "P2"}])
    );
    assert_eq!(
        ctx.store().read(CollectionName::Scores),
        json!({"R1": {"P1": {"holes": [4, 5]}}})
    );
    assert!(remote.pushes().is_empty());
}

#[tokio::test]
async fn local_only_data_is_pushed_back_in_remote_form() {
    let remote = FakeRemote::with(vec![]);
    let ctx = context(Some(remote.clone()));
    ctx.store()
        .write(CollectionName::Players, &json!([{"reg": "p7", "name": "Cy"}]))
        .unwrap();

    let outcome = ctx.load_collection(CollectionName::Players).await;
    assert_eq!(outcome.push_back, RemoteStatus::Pushed);
    assert_eq!(
        remote.stored(CollectionName::Players),
        Some(json!({"P7": {"reg": "P7", "name": "Cy"}}))
    );
}

#[tokio::test]
async fn fetch_failure_degrades_to_local_only() {
    let remote = FakeRemote::with(vec![(CollectionName::Draws, json!({"R1": {"groups": []}}))]);
    remote.fail_fetch.store(true, Ordering::SeqCst);
    let ctx = context(Some(remote.clone()));
    ctx.store()
        .write(CollectionName::Draws, &json!({"R9": {"groups": ["local"]}}))
        .unwrap();

    let outcome = ctx.load_collection(CollectionName::Draws).await;
    assert!(matches!(outcome.fetch, RemoteFetch::Failed(_)));
    assert_eq!(outcome.push_back, RemoteStatus::Skipped);
    assert_eq!(outcome.value, json!({"R9": {"groups": ["local"]}}));
    assert_eq!(
        ctx.store().read(CollectionName::Draws),
        json!({"R9": {"groups": ["local"]}})
    );
    assert!(remote.pushes().is_empty());
}

#[tokio::test]
async fn failed_push_back_keeps_merge_locally() {
    let remote = FakeRemote::with(vec![(
        CollectionName::AdmittedPlayers,
        json!({"R1": ["P1", "P2"]}),
    )]);
    remote.fail_push.store(true, Ordering::SeqCst);
    let ctx = context(Some(remote));
    ctx.store()
        .write(CollectionName::AdmittedPlayers, &json!({"R2": ["P3"]}))
        .unwrap();

    let outcome = ctx.load_collection(CollectionName::AdmittedPlayers).await;
    assert!(outcome.push_back.warning().is_some());
    assert_eq!(
        ctx.store().read(CollectionName::AdmittedPlayers),
        json!({"R1": ["P1", "P2"], "R2": ["P3"]})
    );
}

#[tokio::test]
async fn disabled_sync_reads_local() {
    let ctx = context(None);
    ctx.store()
        .write(CollectionName::Courses, &json!([{"name": "North"}]))
        .unwrap();
    let outcome = ctx.load_collection(CollectionName::Courses).await;
    assert_eq!(outcome.fetch, RemoteFetch::Disabled);
    assert_eq!(outcome.value, json!([{"name": "North"}]));
}

// ============================================================================
// Save and manual sync
// ============================================================================

#[tokio::test]
async fn save_overwrites_both_sides_without_merge() {
    let remote = FakeRemote::with(vec![(
        CollectionName::Tournaments,
        json!({"T1": {"tournamentId": "T1"}, "T2": {"tournamentId": "T2"}}),
    )]);
    let ctx = context(Some(remote.clone()));

    let status = ctx
        .save(CollectionName::Tournaments, json!([{"tournamentId": "T3"}]))
        .await
        .unwrap();
    assert_eq!(status, RemoteStatus::Pushed);
    assert_eq!(
        remote.stored(CollectionName::Tournaments),
        Some(json!({"T3": {"tournamentId": "T3"}}))
    );
    assert_eq!(
        ctx.store().read(CollectionName::Tournaments),
        json!([{"tournamentId": "T3"}])
    );
}

#[tokio::test]
async fn save_push_failure_is_a_warning() {
    let remote = FakeRemote::with(vec![]);
    remote.fail_push.store(true, Ordering::SeqCst);
    let ctx = context(Some(remote));

    let status = ctx
        .save(CollectionName::Courses, json!([{"name": "South"}]))
        .await
        .unwrap();
    assert!(status.warning().unwrap().contains("courses"));
    assert_eq!(
        ctx.store().read(CollectionName::Courses),
        json!([{"name": "South"}])
    );
}

#[tokio::test]
async fn save_keeps_players_without_registration() {
    let remote = FakeRemote::with(vec![]);
    let ctx = context(Some(remote.clone()));

    ctx.save(
        CollectionName::Players,
        json!([{"name": "Walk-in"}, {"reg": "p2", "name": "Bo"}]),
    )
    .await
    .unwrap();
    assert_eq!(
        ctx.store().read(CollectionName::Players),
        json!([{"reg": "P2", "name": "Bo"}, {"name": "Walk-in"}])
    );
    assert_eq!(
        remote.stored(CollectionName::Players),
        Some(json!({"P2": {"reg": "P2", "name": "Bo"}}))
    );

    // A later load must not lose the local-only record.
    let outcome = ctx.load_collection(CollectionName::Players).await;
    assert_eq!(outcome.value[1], json!({"name": "Walk-in"}));
}

#[tokio::test]
async fn sync_all_requires_remote() {
    let ctx = context(None);
    assert!(matches!(ctx.sync_all().await, Err(SyncError::NotConnected)));
}

#[tokio::test]
async fn sync_all_pushes_every_collection() {
    let remote = FakeRemote::with(vec![]);
    let ctx = context(Some(remote.clone()));
    let pushed = ctx.sync_all().await.unwrap();
    assert_eq!(pushed.len(), 6);
    assert_eq!(remote.stored(CollectionName::Scores), Some(json!({})));

    remote.fail_push.store(true, Ordering::SeqCst);
    assert!(matches!(ctx.sync_all().await, Err(SyncError::Remote(_))));
}

// ============================================================================
// Auto-load and player lookup
// ============================================================================

#[tokio::test]
async fn auto_load_copies_everything_to_empty_device() {
    let remote = FakeRemote::with(vec![
        (CollectionName::Courses, json!({"0": {"name": "North"}})),
        (CollectionName::Draws, json!({"R1": {"groups": []}})),
    ]);
    let ctx = context(Some(remote));

    assert!(ctx.auto_load_if_empty().await);
    assert_eq!(ctx.store().read(CollectionName::Courses), json!([{"name": "North"}]));
    assert_eq!(ctx.store().read(CollectionName::Draws), json!({"R1": {"groups": []}}));

    // Now the device has data.
    assert!(!ctx.auto_load_if_empty().await);
}

#[tokio::test]
async fn auto_load_needs_remote_roster() {
    let remote = FakeRemote::with(vec![(CollectionName::Scores, json!({"R1": {}}))]);
    let ctx = context(Some(remote));
    assert!(!ctx.auto_load_if_empty().await);
    assert_eq!(ctx.store().read(CollectionName::Scores), json!({}));

    assert!(!context(None).auto_load_if_empty().await);
}

#[tokio::test]
async fn player_lookup_prefers_remote_fields() {
    let remote = FakeRemote::with(vec![(
        CollectionName::Players,
        json!({"P4626": {"reg": "P4626", "hcp": 12}}),
    )]);
    let ctx = context(Some(remote));
    ctx.store()
        .write(
            CollectionName::Players,
            &json!([{"reg": "P4626", "hcp": 14, "mobile": "555"}]),
        )
        .unwrap();

    let player = ctx.find_player("p4626").await.unwrap();
    assert_eq!(player["hcp"], 12);
    assert_eq!(player["mobile"], "555");
    assert!(ctx.find_player("P0000").await.is_none());
}

// ============================================================================
// Identity
// ============================================================================

struct FakeIdentity {
    role: Role,
    role_delay: Duration,
    token: Mutex<Option<String>>,
}

impl FakeIdentity {
    fn new(role: Role, role_delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            role,
            role_delay,
            token: Mutex::new(None),
        })
    }
}

impl IdentityStore for FakeIdentity {
    async fn sign_in(&self, identifier: &str, secret: &str) -> Result<Session, RemoteError> {
        if secret != "pw" {
            return Err(RemoteError::Status {
                status: 401,
                body: "Unauthorized".into(),
            });
        }
        Ok(Session {
            token: "t1".into(),
            principal: Principal {
                uid: "u1".into(),
                login_name: identifier.to_uppercase(),
                email: None,
                player_reg: Some(identifier.to_uppercase()),
            },
            role: self.role,
        })
    }

    async fn sign_out(&self) -> Result<(), RemoteError> {
        Ok(())
    }

    async fn role_of(&self, _uid: &str) -> Result<Role, RemoteError> {
        tokio::time::sleep(self.role_delay).await;
        Ok(self.role)
    }

    fn set_token(&self, token: Option<String>) {
        *self.token.lock().unwrap() = token;
    }
}

fn identity_client(
    identity: Arc<FakeIdentity>,
) -> (IdentityClient<FakeIdentity, MemoryBackend>, Arc<LocalStore<MemoryBackend>>) {
    let store = Arc::new(LocalStore::new(MemoryBackend::new()));
    let client = IdentityClient::new(identity, store.clone(), Duration::from_millis(100));
    (client, store)
}

#[tokio::test]
async fn sign_in_persists_principal_and_token() {
    let identity = FakeIdentity::new(Role::Club, Duration::ZERO);
    let (client, store) = identity_client(identity.clone());

    let principal = client.sign_in("p4626", "pw").await.unwrap();
    assert_eq!(principal.login_name, "P4626");
    assert_eq!(client.current_principal(), Some(principal.clone()));
    assert_eq!(store.read_current_user(), Some(principal));
    assert_eq!(identity.token.lock().unwrap().as_deref(), Some("t1"));
    assert_eq!(
        store.backend().get(fairway_client::SESSION_TOKEN_KEY).unwrap().as_deref(),
        Some("t1")
    );

    client.sign_out().await.unwrap();
    assert_eq!(client.current_principal(), None);
    assert_eq!(store.read_current_user(), None);
    assert_eq!(*identity.token.lock().unwrap(), None);
}

#[test]
fn local_session_clears_without_remote() {
    let store = LocalStore::new(MemoryBackend::new());
    store
        .write_current_user(&Principal {
            uid: "u1".into(),
            login_name: "P1".into(),
            email: None,
            player_reg: Some("P1".into()),
        })
        .unwrap();
    store
        .backend()
        .set(fairway_client::SESSION_TOKEN_KEY, "t1".into())
        .unwrap();

    clear_local_session(&store).unwrap();
    assert_eq!(store.read_current_user(), None);
    assert_eq!(
        store.backend().get(fairway_client::SESSION_TOKEN_KEY).unwrap(),
        None
    );
}

#[tokio::test]
async fn wrong_secret_is_invalid_credentials() {
    let (client, _) = identity_client(FakeIdentity::new(Role::User, Duration::ZERO));
    assert!(matches!(
        client.sign_in("admin", "nope").await,
        Err(IdentityError::InvalidCredentials)
    ));
    assert_eq!(client.current_principal(), None);
}

#[tokio::test]
async fn slow_role_lookup_defaults_to_user() {
    let (client, _) = identity_client(FakeIdentity::new(Role::Admin, Duration::from_secs(10)));
    let principal = client.sign_in("admin", "pw").await.unwrap();
    assert_eq!(client.role_of(&principal).await, Role::User);
}

#[tokio::test]
async fn require_role_checks_exact_role() {
    let (client, _) = identity_client(FakeIdentity::new(Role::Club, Duration::ZERO));
    assert!(matches!(
        client.require_role(Role::Club).await,
        Err(IdentityError::NotSignedIn)
    ));

    client.sign_in("club", "pw").await.unwrap();
    let (_, role) = client.require_role(Role::Club).await.unwrap();
    assert_eq!(role, Role::Club);
    assert!(matches!(
        client.require_role(Role::Admin).await,
        Err(IdentityError::InsufficientPermissions {
            required: Role::Admin,
            actual: Role::Club
        })
    ));
}

#[tokio::test]
async fn identity_changes_stop_after_cancel() {
    let (client, _) = identity_client(FakeIdentity::new(Role::User, Duration::ZERO));
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let subscription = client.on_identity_change(move |principal| {
        let _ = tx.send(principal.map(|p| p.uid));
    });

    assert_eq!(rx.recv().await, Some(None));
    client.sign_in("p1", "pw").await.unwrap();
    assert_eq!(rx.recv().await, Some(Some("u1".to_string())));

    subscription.cancel().await;
    client.sign_out().await.unwrap();
    // The callback (and its sender) is gone, so the channel closes.
    assert_eq!(rx.recv().await, None);
}
