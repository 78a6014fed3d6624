use std::collections::HashMap;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::RwLock;
use tracing::debug;

use crate::models::ServerMessage;

struct ConnectionEntry {
    sender: UnboundedSender<ServerMessage>,
    /// Room this connection is currently a member of, if any
    room_id: Option<String>,
}

/// Transport-facing send surface. Each live websocket registers an
/// outbound channel here under its connection id; the message handlers
/// compute recipient sets from room membership and emit through this
/// map, so no room/broadcast grouping is assumed of the transport
/// itself.
///
/// This lock is a leaf: nothing awaits the registry map or a room
/// mutex while holding it.
pub struct ConnectionGateway {
    connections: RwLock<HashMap<String, ConnectionEntry>>,
}

impl Default for ConnectionGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionGateway {
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
        }
    }

    /// Register a freshly established connection
    pub async fn register(&self, connection_id: &str, sender: UnboundedSender<ServerMessage>) {
        self.connections.write().await.insert(
            connection_id.to_string(),
            ConnectionEntry {
                sender,
                room_id: None,
            },
        );
    }

    /// Drop the connection and return the room it was in, if any.
    /// A second call for the same id returns None, which makes the
    /// disconnect path idempotent.
    pub async fn unregister(&self, connection_id: &str) -> Option<String> {
        self.connections
            .write()
            .await
            .remove(connection_id)
            .and_then(|entry| entry.room_id)
    }

    /// Record which room the connection is a member of
    pub async fn set_room(&self, connection_id: &str, room_id: Option<String>) {
        if let Some(entry) = self.connections.write().await.get_mut(connection_id) {
            entry.room_id = room_id;
        }
    }

    pub async fn current_room(&self, connection_id: &str) -> Option<String> {
        self.connections
            .read()
            .await
            .get(connection_id)
            .and_then(|entry| entry.room_id.clone())
    }

    /// Send one event to one connection. A closed or missing channel is
    /// not an error; the disconnect path cleans the entry up.
    pub async fn send_to(&self, connection_id: &str, message: ServerMessage) {
        let connections = self.connections.read().await;
        match connections.get(connection_id) {
            Some(entry) => {
                if entry.sender.send(message).is_err() {
                    debug!(conn = %connection_id, "Dropped send to closed connection");
                }
            }
            None => debug!(conn = %connection_id, "Dropped send to unknown connection"),
        }
    }

    /// Send one event to a computed recipient set
    pub async fn send_to_many(&self, connection_ids: &[String], message: &ServerMessage) {
        let connections = self.connections.read().await;
        for id in connection_ids {
            match connections.get(id) {
                Some(entry) => {
                    if entry.sender.send(message.clone()).is_err() {
                        debug!(conn = %id, "Dropped broadcast to closed connection");
                    }
                }
                None => debug!(conn = %id, "Dropped broadcast to unknown connection"),
            }
        }
    }

    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }
}
