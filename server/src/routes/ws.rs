//! WebSocket upgrade route.

use axum::{
    extract::{ws::rejection::WebSocketUpgradeRejection, Query, State, WebSocketUpgrade},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde::Deserialize;

use crate::auth::AuthUser;
use crate::error::{AppError, Result};
use crate::handlers::websocket::handle_websocket_connection;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    /// Player registration number for draw notifications
    #[serde(default)]
    pub reg: Option<String>,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/ws", get(ws_handler))
}

/// Registration number a connection receives draw notices for.
///
/// Only a signed-in player's own number is accepted. A `reg` query naming
/// anyone else is refused.
pub fn notification_reg(auth: &AuthUser, requested: Option<&str>) -> Result<Option<String>> {
    let own = auth.principal.as_ref().and_then(|p| p.player_reg.clone());
    let Some(requested) = requested.map(str::trim).filter(|r| !r.is_empty()) else {
        return Ok(own);
    };

    match (&auth.principal, own) {
        (None, _) => Err(AppError::Unauthorized),
        (Some(_), Some(own)) if own.eq_ignore_ascii_case(requested) => Ok(Some(own)),
        (Some(_), _) => Err(AppError::Forbidden(format!(
            "cannot receive notifications for {requested}"
        ))),
    }
}

/// GET /ws - upgrade to a realtime connection.
async fn ws_handler(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<WsQuery>,
    ws: std::result::Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let player_reg = match notification_reg(&auth, query.reg.as_deref()) {
        Ok(reg) => reg,
        Err(e) => return e.into_response(),
    };
    let ws = match ws {
        Ok(ws) => ws,
        Err(rejection) => return rejection.into_response(),
    };

    ws.on_upgrade(move |socket| {
        handle_websocket_connection(socket, state.pool, state.conn_manager, player_reg)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use fairway_engine::{Principal, Role};

    fn signed_in(player_reg: Option<&str>) -> AuthUser {
        AuthUser {
            principal: Some(Principal {
                uid: "u1".into(),
                login_name: "P4626".into(),
                email: None,
                player_reg: player_reg.map(str::to_string),
            }),
            role: Role::User,
            token: Some("t".into()),
        }
    }

    fn anonymous() -> AuthUser {
        AuthUser {
            principal: None,
            role: Role::User,
            token: None,
        }
    }

    #[test]
    fn own_registration_is_used() {
        let auth = signed_in(Some("P4626"));
        assert_eq!(notification_reg(&auth, None).unwrap().as_deref(), Some("P4626"));
        assert_eq!(
            notification_reg(&auth, Some("p4626")).unwrap().as_deref(),
            Some("P4626")
        );
        assert_eq!(notification_reg(&anonymous(), None).unwrap(), None);
    }

    #[test]
    fn other_registrations_are_refused() {
        assert!(matches!(
            notification_reg(&anonymous(), Some("P4626")),
            Err(AppError::Unauthorized)
        ));
        assert!(matches!(
            notification_reg(&signed_in(Some("P1")), Some("P4626")),
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            notification_reg(&signed_in(None), Some("P4626")),
            Err(AppError::Forbidden(_))
        ));
    }
}
