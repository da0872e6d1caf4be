//! Authentication extractor.
//!
//! Resolves a `Bearer` session token against the sessions table. When the
//! server runs with `REQUIRE_AUTH=false`, requests without a token are let
//! through as an anonymous user.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use fairway_engine::{Principal, Role};

use crate::db;
use crate::error::AppError;
use crate::AppState;

/// The caller behind a request.
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// `None` for anonymous access
    pub principal: Option<Principal>,
    pub role: Role,
    /// Session token the request carried
    pub token: Option<String>,
}

impl AuthUser {
    fn anonymous() -> Self {
        Self {
            principal: None,
            role: Role::User,
            token: None,
        }
    }

    /// Fail unless the caller holds exactly `required`.
    pub fn require(&self, required: Role) -> Result<(), AppError> {
        if self.principal.is_none() {
            return Err(AppError::Unauthorized);
        }
        self.role.require(required)?;
        Ok(())
    }
}

fn bearer_token(parts: &Parts) -> Result<Option<&str>, AppError> {
    let Some(header) = parts.headers.get(AUTHORIZATION) else {
        return Ok(None);
    };
    let header = header.to_str().map_err(|_| AppError::Unauthorized)?;
    match header.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(Some(token.trim())),
        _ => Err(AppError::Unauthorized),
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(token) = bearer_token(parts)? else {
            if state.config.require_auth {
                return Err(AppError::Unauthorized);
            }
            return Ok(AuthUser::anonymous());
        };

        let user = db::user_for_token(&state.pool, token)
            .await?
            .ok_or(AppError::Unauthorized)?;

        Ok(AuthUser {
            principal: Some(user.to_principal()),
            role: user.role(),
            token: Some(token.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(header: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/data/players");
        if let Some(value) = header {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn bearer_parsing() {
        assert_eq!(bearer_token(&parts(None)).unwrap(), None);
        assert_eq!(bearer_token(&parts(Some("Bearer abc"))).unwrap(), Some("abc"));
        assert!(bearer_token(&parts(Some("Basic abc"))).is_err());
        assert!(bearer_token(&parts(Some("Bearer  "))).is_err());
    }

    #[test]
    fn anonymous_cannot_pass_role_checks() {
        let anon = AuthUser::anonymous();
        assert!(matches!(anon.require(Role::User), Err(AppError::Unauthorized)));

        let club = AuthUser {
            principal: Some(Principal {
                uid: "u1".into(),
                login_name: "club".into(),
                email: None,
                player_reg: None,
            }),
            role: Role::Club,
            token: Some("t".into()),
        };
        assert!(club.require(Role::Club).is_ok());
        assert!(matches!(club.require(Role::Admin), Err(AppError::Engine(_))));
    }
}
