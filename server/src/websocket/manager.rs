//! WebSocket connection manager.
//!
//! Tracks active connections, their collection subscriptions, and which
//! player (if any) each connection belongs to.

use std::collections::HashSet;
use std::sync::Arc;

use dashmap::DashMap;
use fairway_engine::CollectionName;
use tokio::sync::mpsc;

use super::ServerMessage;

/// Sender for WebSocket messages.
pub type MessageSender = mpsc::UnboundedSender<ServerMessage>;

/// A single WebSocket connection.
#[derive(Debug)]
pub struct Connection {
    /// Unique identifier for this connection
    pub id: String,
    /// Registration number of the player this connection belongs to
    pub player_reg: Option<String>,
    /// Collections this connection wants `changed` messages for
    pub subscriptions: HashSet<CollectionName>,
    /// Channel to send messages to this connection
    pub sender: MessageSender,
}

/// Manages active WebSocket connections.
///
/// Thread-safe and can be shared across handlers via `Arc`.
#[derive(Debug, Default)]
pub struct ConnectionManager {
    /// All active connections, keyed by connection ID.
    connections: DashMap<String, Connection>,
    /// Connection IDs by uppercased player registration number.
    by_player: DashMap<String, Vec<String>>,
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new connection manager wrapped in Arc for sharing.
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Register a new connection.
    ///
    /// Returns the connection ID.
    pub fn register(&self, player_reg: Option<String>, sender: MessageSender) -> String {
        let conn_id = uuid::Uuid::new_v4().to_string();
        let player_reg = player_reg
            .map(|reg| reg.trim().to_uppercase())
            .filter(|reg| !reg.is_empty());

        if let Some(reg) = &player_reg {
            self.by_player
                .entry(reg.clone())
                .or_default()
                .push(conn_id.clone());
        }

        self.connections.insert(
            conn_id.clone(),
            Connection {
                id: conn_id.clone(),
                player_reg,
                subscriptions: HashSet::new(),
                sender,
            },
        );

        tracing::info!(conn_id = %conn_id, "WebSocket connection registered");

        conn_id
    }

    /// Unregister a connection.
    pub fn unregister(&self, conn_id: &str) {
        let Some((_, conn)) = self.connections.remove(conn_id) else {
            return;
        };

        if let Some(reg) = &conn.player_reg {
            if let Some(mut conn_ids) = self.by_player.get_mut(reg) {
                conn_ids.retain(|id| id != conn_id);
                if conn_ids.is_empty() {
                    drop(conn_ids);
                    self.by_player.remove(reg);
                }
            }
        }

        tracing::info!(
            conn_id = %conn_id,
            player_reg = ?conn.player_reg,
            "WebSocket connection unregistered"
        );
    }

    /// Returns false if the connection is gone.
    pub fn subscribe(&self, conn_id: &str, collection: CollectionName) -> bool {
        match self.connections.get_mut(conn_id) {
            Some(mut conn) => {
                conn.subscriptions.insert(collection);
                true
            }
            None => false,
        }
    }

    pub fn unsubscribe(&self, conn_id: &str, collection: CollectionName) {
        if let Some(mut conn) = self.connections.get_mut(conn_id) {
            conn.subscriptions.remove(&collection);
        }
    }

    /// Send a `changed` message to every subscriber of `collection`.
    ///
    /// Returns the number of connections that received the message.
    pub fn broadcast_changed(&self, collection: CollectionName, message: ServerMessage) -> usize {
        let mut sent_count = 0;

        for entry in self.connections.iter() {
            let conn = entry.value();
            if conn.subscriptions.contains(&collection) && conn.sender.send(message.clone()).is_ok() {
                sent_count += 1;
            }
        }

        tracing::debug!(
            collection = %collection,
            recipients = sent_count,
            "Broadcast change to subscribers"
        );

        sent_count
    }

    /// Send a message to every connection of one player.
    ///
    /// Returns the number of connections that received the message.
    pub fn send_to_player(&self, reg: &str, message: ServerMessage) -> usize {
        let Some(conn_ids) = self.by_player.get(&reg.to_uppercase()).map(|ids| ids.clone()) else {
            return 0;
        };

        conn_ids
            .iter()
            .filter(|id| self.send_to(id, message.clone()))
            .count()
    }

    /// Send a message to a specific connection.
    pub fn send_to(&self, conn_id: &str, message: ServerMessage) -> bool {
        match self.connections.get(conn_id) {
            Some(conn) => conn.sender.send(message).is_ok(),
            None => false,
        }
    }

    /// Get the number of active connections.
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Get the number of distinct players connected.
    pub fn player_count(&self) -> usize {
        self.by_player.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_register_unregister() {
        let manager = ConnectionManager::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        let (tx2, _rx2) = mpsc::unbounded_channel();

        let conn_id = manager.register(Some("p4626".to_string()), tx);
        let anon = manager.register(None, tx2);
        assert_eq!(manager.connection_count(), 2);
        assert_eq!(manager.player_count(), 1);

        manager.unregister(&conn_id);
        manager.unregister(&anon);
        assert_eq!(manager.connection_count(), 0);
        assert_eq!(manager.player_count(), 0);
    }

    #[test]
    fn test_broadcast_reaches_only_subscribers() {
        let manager = ConnectionManager::new();

        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, mut rx2) = mpsc::unbounded_channel();

        let conn1 = manager.register(None, tx1);
        let conn2 = manager.register(None, tx2);
        assert!(manager.subscribe(&conn1, CollectionName::Scores));
        assert!(manager.subscribe(&conn2, CollectionName::Draws));

        let msg = ServerMessage::changed(CollectionName::Scores, Some(json!({})));
        assert_eq!(manager.broadcast_changed(CollectionName::Scores, msg), 1);

        assert!(matches!(
            rx1.try_recv().unwrap(),
            ServerMessage::Changed { collection: CollectionName::Scores, .. }
        ));
        assert!(rx2.try_recv().is_err());

        manager.unsubscribe(&conn1, CollectionName::Scores);
        let msg = ServerMessage::changed(CollectionName::Scores, None);
        assert_eq!(manager.broadcast_changed(CollectionName::Scores, msg), 0);
    }

    #[test]
    fn test_send_to_player_ignores_case() {
        let manager = ConnectionManager::new();
        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, mut rx2) = mpsc::unbounded_channel();
        manager.register(Some("P1".to_string()), tx1);
        manager.register(Some("p1".to_string()), tx2);

        assert_eq!(manager.send_to_player("p1", ServerMessage::Pong), 2);
        assert!(matches!(rx1.try_recv().unwrap(), ServerMessage::Pong));
        assert!(matches!(rx2.try_recv().unwrap(), ServerMessage::Pong));
        assert_eq!(manager.send_to_player("P2", ServerMessage::Pong), 0);
    }

    #[test]
    fn test_subscribe_unknown_connection() {
        let manager = ConnectionManager::new();
        assert!(!manager.subscribe("missing", CollectionName::Courses));
    }
}
