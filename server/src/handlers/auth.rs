//! Identity handlers - sign-in, sessions, role lookup and provisioning.

use fairway_engine::{Principal, Role};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::auth::AuthUser;
use crate::config::AdminBootstrap;
use crate::db::{self, NewUser, StoredUser};
use crate::error::{AppError, Result};

/// Request body for sign-in.
#[derive(Debug, Deserialize)]
pub struct SignInRequest {
    /// Login name or player registration number
    pub identifier: String,
    pub secret: String,
}

/// Response for sign-in and session lookup.
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    pub principal: Principal,
    pub role: Role,
}

/// Response for role lookup.
#[derive(Debug, Serialize, Deserialize)]
pub struct RoleResponse {
    pub role: Role,
}

/// Request body for provisioning an account.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub login_name: String,
    pub secret: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub player_reg: Option<String>,
    #[serde(default)]
    pub role: Role,
}

// Argon2 work runs on the blocking pool.
async fn hash_secret_blocking(secret: String) -> Result<String> {
    tokio::task::spawn_blocking(move || db::hash_secret(&secret))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
        .map_err(|e| AppError::Internal(format!("password hashing failed: {e}")))
}

async fn verify_blocking(user: StoredUser, secret: String) -> Result<Option<StoredUser>> {
    tokio::task::spawn_blocking(move || user.verify(&secret).then_some(user))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))
}

/// Verify credentials and open a session.
pub async fn handle_sign_in(pool: &PgPool, request: SignInRequest) -> Result<SessionResponse> {
    let identifier = request.identifier.trim();
    let found = match db::find_user_by_login(pool, identifier).await? {
        Some(user) => verify_blocking(user, request.secret).await?,
        None => None,
    };
    let user = found.ok_or_else(|| {
        tracing::info!(identifier = %identifier, "sign-in rejected");
        AppError::Unauthorized
    })?;

    let token = db::create_session(pool, &user.uid).await?;
    tracing::info!(uid = %user.uid, "signed in");

    Ok(SessionResponse {
        token: Some(token),
        principal: user.to_principal(),
        role: user.role(),
    })
}

/// The caller's own principal and role.
pub fn handle_me(auth: AuthUser) -> Result<SessionResponse> {
    let principal = auth.principal.ok_or(AppError::Unauthorized)?;
    Ok(SessionResponse {
        token: None,
        principal,
        role: auth.role,
    })
}

/// Close the caller's session. Anonymous callers have nothing to close.
pub async fn handle_sign_out(pool: &PgPool, auth: &AuthUser) -> Result<()> {
    if let Some(token) = &auth.token {
        db::delete_session(pool, token).await?;
    }
    Ok(())
}

/// Role of any user; unknown users are plain users.
pub async fn handle_role_of(pool: &PgPool, uid: &str) -> Result<RoleResponse> {
    let role = db::find_user_by_uid(pool, uid)
        .await?
        .map(|user| user.role())
        .unwrap_or_default();
    Ok(RoleResponse { role })
}

/// Provision an account. Only admins may do this.
pub async fn handle_create_user(
    pool: &PgPool,
    caller: &AuthUser,
    request: CreateUserRequest,
) -> Result<Principal> {
    caller.require(Role::Admin)?;

    let login_name = request.login_name.trim();
    if login_name.is_empty() || request.secret.is_empty() {
        return Err(AppError::BadRequest(
            "loginName and secret are required".to_string(),
        ));
    }
    if db::find_user_by_login(pool, login_name).await?.is_some() {
        return Err(AppError::BadRequest(format!("{login_name} already exists")));
    }

    let password_hash = hash_secret_blocking(request.secret.clone()).await?;
    let user = db::insert_user(
        pool,
        NewUser {
            login_name,
            email: request.email.as_deref(),
            player_reg: request.player_reg.as_deref(),
            role: request.role,
            password_hash,
        },
    )
    .await?;

    tracing::info!(uid = %user.uid, role = %user.role(), "user provisioned");

    Ok(user.to_principal())
}

/// Create or reset the configured admin account so a fresh deployment has
/// someone who can provision users.
pub async fn bootstrap_admin(pool: &PgPool, admin: &AdminBootstrap) -> Result<Principal> {
    let password_hash = hash_secret_blocking(admin.secret.clone()).await?;
    let user = db::ensure_admin(pool, &admin.login_name, &password_hash).await?;
    tracing::info!(uid = %user.uid, login_name = %user.login_name, "admin account ensured");
    Ok(user.to_principal())
}
