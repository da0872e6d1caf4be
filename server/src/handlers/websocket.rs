//! WebSocket handler for realtime subscriptions.
//!
//! Forwards `changed` and `draw_notification` messages to the client and
//! serves subscribe/unsubscribe/ping requests.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use sqlx::PgPool;
use tokio::sync::mpsc;

use crate::websocket::{ClientMessage, ConnectionManager, ServerMessage};

use super::handle_fetch;

/// Handle an established WebSocket connection.
///
/// Registers the connection (under `player_reg` when known), forwards
/// outgoing messages from a channel, and processes incoming messages until
/// the client goes away.
pub async fn handle_websocket_connection(
    socket: WebSocket,
    pool: PgPool,
    conn_manager: Arc<ConnectionManager>,
    player_reg: Option<String>,
) {
    let (mut ws_sender, mut ws_receiver) = socket.split();

    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();

    let conn_id = conn_manager.register(player_reg.clone(), tx);

    tracing::info!(
        conn_id = %conn_id,
        player_reg = ?player_reg,
        "WebSocket client connected"
    );

    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            match serde_json::to_string(&msg) {
                Ok(text) => {
                    if let Err(e) = ws_sender.send(Message::Text(text.into())).await {
                        tracing::warn!("Failed to send WebSocket message: {}", e);
                        break;
                    }
                }
                Err(e) => {
                    tracing::error!("Failed to serialize WebSocket message: {}", e);
                }
            }
        }
    });

    while let Some(result) = ws_receiver.next().await {
        match result {
            Ok(Message::Text(text)) => {
                if let Some(response) = process_message(&text, &pool, &conn_manager, &conn_id).await {
                    conn_manager.send_to(&conn_id, response);
                }
            }
            Ok(Message::Binary(_)) => {
                tracing::warn!("Binary messages not supported");
            }
            Ok(Message::Ping(data)) => {
                tracing::trace!("Received ping: {} bytes", data.len());
            }
            Ok(Message::Pong(_)) => {
                tracing::trace!("Received pong");
            }
            Ok(Message::Close(_)) => {
                tracing::info!(conn_id = %conn_id, "WebSocket close frame received");
                break;
            }
            Err(e) => {
                tracing::warn!(conn_id = %conn_id, "WebSocket error: {}", e);
                break;
            }
        }
    }

    conn_manager.unregister(&conn_id);
    send_task.abort();

    tracing::info!(
        conn_id = %conn_id,
        active_connections = conn_manager.connection_count(),
        "WebSocket client disconnected"
    );
}

/// Process a client message, returning the direct response if any.
async fn process_message(
    text: &str,
    pool: &PgPool,
    conn_manager: &ConnectionManager,
    conn_id: &str,
) -> Option<ServerMessage> {
    let client_msg: ClientMessage = match serde_json::from_str(text) {
        Ok(msg) => msg,
        Err(e) => {
            return Some(ServerMessage::error(
                format!("Invalid message format: {}", e),
                None,
            ));
        }
    };

    match client_msg {
        ClientMessage::Subscribe {
            collection,
            request_id,
        } => {
            // Register before reading so a write racing the read is still delivered.
            conn_manager.subscribe(conn_id, collection);
            match handle_fetch(pool, collection).await {
                Ok(value) => Some(ServerMessage::changed(collection, Some(value))),
                Err(e) => Some(ServerMessage::error(e.to_string(), request_id)),
            }
        }

        ClientMessage::Unsubscribe { collection, .. } => {
            conn_manager.unsubscribe(conn_id, collection);
            None
        }

        ClientMessage::Ping => Some(ServerMessage::Pong),
    }
}
