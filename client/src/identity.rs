//! Identity client: sign-in state, role lookup and change notifications.

use std::sync::Arc;
use std::time::Duration;

use fairway_engine::{KeyValueBackend, LocalStore, Principal, Role};
use tokio::sync::watch;

use crate::error::{IdentityError, RemoteError};
use crate::remote::IdentityStore;
use crate::subscribe::Subscription;

/// Local key holding the bearer token of the signed-in session.
pub const SESSION_TOKEN_KEY: &str = "sessionToken";

/// Forget the signed-in principal and session token cached on this device.
///
/// This is all a sign-out can do when no remote is configured.
pub fn clear_local_session<B: KeyValueBackend>(store: &LocalStore<B>) -> Result<(), IdentityError> {
    store.clear_current_user()?;
    store.backend().remove(SESSION_TOKEN_KEY)?;
    Ok(())
}

/// Tracks who is signed in on this device.
///
/// The principal is cached in the local store so it survives restarts.
pub struct IdentityClient<I, B> {
    identity: Arc<I>,
    store: Arc<LocalStore<B>>,
    role_timeout: Duration,
    current: watch::Sender<Option<Principal>>,
}

impl<I, B> IdentityClient<I, B>
where
    I: IdentityStore + 'static,
    B: KeyValueBackend + 'static,
{
    pub fn new(identity: Arc<I>, store: Arc<LocalStore<B>>, role_timeout: Duration) -> Self {
        let (current, _) = watch::channel(store.read_current_user());
        Self {
            identity,
            store,
            role_timeout,
            current,
        }
    }

    pub fn current_principal(&self) -> Option<Principal> {
        self.current.borrow().clone()
    }

    /// Sign in by login name or registration number.
    pub async fn sign_in(&self, identifier: &str, secret: &str) -> Result<Principal, IdentityError> {
        let session = self
            .identity
            .sign_in(identifier, secret)
            .await
            .map_err(|e| {
                if e.is_unauthorized() {
                    IdentityError::InvalidCredentials
                } else {
                    IdentityError::Remote(e)
                }
            })?;

        self.identity.set_token(Some(session.token.clone()));
        self.store.write_current_user(&session.principal)?;
        self.store
            .backend()
            .set(SESSION_TOKEN_KEY, session.token.clone())?;

        tracing::info!(uid = %session.principal.uid, role = %session.role, "signed in");
        self.current.send_replace(Some(session.principal.clone()));
        Ok(session.principal)
    }

    /// Sign out. The local session is cleared even if the remote call fails.
    pub async fn sign_out(&self) -> Result<(), IdentityError> {
        let remote = self.identity.sign_out().await;

        self.identity.set_token(None);
        clear_local_session(&self.store)?;
        self.current.send_replace(None);

        if let Err(e) = remote {
            tracing::warn!("remote sign-out failed: {}", e);
        }
        Ok(())
    }

    /// Role of `principal`, or [`Role::User`] when the lookup fails or
    /// takes longer than the configured timeout.
    pub async fn role_of(&self, principal: &Principal) -> Role {
        let lookup = self.identity.role_of(&principal.uid);
        match tokio::time::timeout(self.role_timeout, lookup)
            .await
            .unwrap_or(Err(RemoteError::Timeout))
        {
            Ok(role) => role,
            Err(e) => {
                tracing::warn!(uid = %principal.uid, "role lookup failed, assuming user: {}", e);
                Role::User
            }
        }
    }

    /// The signed-in principal and its role, if the role is exactly `required`.
    pub async fn require_role(&self, required: Role) -> Result<(Principal, Role), IdentityError> {
        let principal = self.current_principal().ok_or(IdentityError::NotSignedIn)?;
        let role = self.role_of(&principal).await;
        if role != required {
            return Err(IdentityError::InsufficientPermissions {
                required,
                actual: role,
            });
        }
        Ok((principal, role))
    }

    /// Call `callback` with the current principal now and on every change
    /// until the returned subscription is cancelled or dropped.
    pub fn on_identity_change<F>(&self, mut callback: F) -> Subscription
    where
        F: FnMut(Option<Principal>) + Send + 'static,
    {
        let mut receiver = self.current.subscribe();
        Subscription::spawn(async move {
            loop {
                let principal = receiver.borrow_and_update().clone();
                callback(principal);
                if receiver.changed().await.is_err() {
                    break;
                }
            }
        })
    }
}
