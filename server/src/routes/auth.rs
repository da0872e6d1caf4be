//! Identity routes.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use fairway_engine::Principal;

use crate::auth::AuthUser;
use crate::error::Result;
use crate::handlers::{
    handle_create_user, handle_me, handle_role_of, handle_sign_in, handle_sign_out,
    CreateUserRequest, RoleResponse, SessionResponse, SignInRequest,
};
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/auth/sign-in", post(sign_in_handler))
        .route("/auth/sign-out", post(sign_out_handler))
        .route("/auth/me", get(me_handler))
        .route("/auth/roles/{uid}", get(role_handler))
        .route("/auth/users", post(create_user_handler))
}

/// POST /auth/sign-in
async fn sign_in_handler(
    State(state): State<AppState>,
    Json(request): Json<SignInRequest>,
) -> Result<Json<SessionResponse>> {
    Ok(Json(handle_sign_in(&state.pool, request).await?))
}

/// POST /auth/sign-out
async fn sign_out_handler(State(state): State<AppState>, auth: AuthUser) -> Result<StatusCode> {
    handle_sign_out(&state.pool, &auth).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /auth/me
async fn me_handler(auth: AuthUser) -> Result<Json<SessionResponse>> {
    Ok(Json(handle_me(auth)?))
}

/// GET /auth/roles/{uid}
async fn role_handler(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(uid): Path<String>,
) -> Result<Json<RoleResponse>> {
    Ok(Json(handle_role_of(&state.pool, &uid).await?))
}

/// POST /auth/users - admin only.
async fn create_user_handler(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(request): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<Principal>)> {
    let principal = handle_create_user(&state.pool, &auth, request).await?;
    Ok((StatusCode::CREATED, Json(principal)))
}
