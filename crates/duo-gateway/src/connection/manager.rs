//! Connection manager
//!
//! Tracks all live sockets and the room each is subscribed to, using
//! DashMap for lock-free concurrent access.

use super::{Connection, ConnectionState};
use crate::protocol::ServerEvent;
use dashmap::DashMap;
use duo_core::Snowflake;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Registry of live WebSocket connections
pub struct ConnectionManager {
    /// Active connections by socket id
    connections: DashMap<String, Arc<Connection>>,

    /// Room id to socket ids subscribed to that room
    room_sockets: DashMap<Snowflake, HashSet<String>>,
}

impl ConnectionManager {
    #[must_use]
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
            room_sockets: DashMap::new(),
        }
    }

    #[must_use]
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Register a freshly authenticated socket
    pub fn add_connection(
        &self,
        socket_id: String,
        session_id: String,
        user_id: Snowflake,
        sender: mpsc::Sender<ServerEvent>,
    ) -> Arc<Connection> {
        let connection = Connection::new(socket_id.clone(), session_id, user_id, sender);
        self.connections.insert(socket_id.clone(), connection.clone());

        tracing::debug!(socket_id = %socket_id, user_id = %user_id, "Connection added");
        connection
    }

    /// Remove a socket and drop its room subscription
    pub async fn remove_connection(&self, socket_id: &str) {
        if let Some((_, connection)) = self.connections.remove(socket_id) {
            if let Some(room_id) = connection.room_id().await {
                self.room_sockets.alter(&room_id, |_, mut sockets| {
                    sockets.remove(socket_id);
                    sockets
                });
                self.room_sockets.retain(|_, sockets| !sockets.is_empty());
            }

            connection.set_state(ConnectionState::Disconnected).await;
            tracing::debug!(socket_id = %socket_id, "Connection removed");
        }
    }

    pub fn get_connection(&self, socket_id: &str) -> Option<Arc<Connection>> {
        self.connections.get(socket_id).map(|r| r.clone())
    }

    /// Subscribe a socket to a room's broadcast topic
    pub async fn join_room(&self, socket_id: &str, room_id: Snowflake) -> bool {
        let Some(connection) = self.get_connection(socket_id) else {
            return false;
        };

        // A socket is in at most one room; moving rooms drops the old topic
        if let Some(previous) = connection.room_id().await {
            if previous != room_id {
                self.leave_room(socket_id, previous).await;
            }
        }

        connection.set_state(ConnectionState::InRoom(room_id)).await;
        self.room_sockets
            .entry(room_id)
            .or_default()
            .insert(socket_id.to_string());

        tracing::trace!(socket_id = %socket_id, room_id = %room_id, "Socket joined room topic");
        true
    }

    /// Unsubscribe a socket from a room's broadcast topic
    pub async fn leave_room(&self, socket_id: &str, room_id: Snowflake) -> bool {
        let Some(connection) = self.get_connection(socket_id) else {
            return false;
        };

        connection.set_state(ConnectionState::Authenticated).await;
        self.room_sockets.alter(&room_id, |_, mut sockets| {
            sockets.remove(socket_id);
            sockets
        });
        self.room_sockets.retain(|_, sockets| !sockets.is_empty());

        tracing::trace!(socket_id = %socket_id, room_id = %room_id, "Socket left room topic");
        true
    }

    /// All sockets subscribed to a room
    pub fn room_connections(&self, room_id: Snowflake) -> Vec<Arc<Connection>> {
        self.room_sockets
            .get(&room_id)
            .map(|sockets| {
                sockets
                    .iter()
                    .filter_map(|sid| self.connections.get(sid).map(|c| c.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Send an event to every socket in a room, optionally skipping one user
    pub async fn send_to_room(
        &self,
        room_id: Snowflake,
        event: ServerEvent,
        exclude_user: Option<Snowflake>,
    ) -> usize {
        let connections = self.room_connections(room_id);
        let mut sent = 0;

        for conn in connections {
            if exclude_user == Some(conn.user_id()) {
                continue;
            }
            if conn.send(event.clone()).await.is_ok() {
                sent += 1;
            }
        }

        tracing::trace!(room_id = %room_id, sent, event = event.name(), "Event sent to room");
        sent
    }

    /// Send an event to every socket of a user
    pub async fn send_to_user(&self, user_id: Snowflake, event: ServerEvent) -> usize {
        let mut sent = 0;
        for entry in &self.connections {
            if entry.user_id() == user_id && entry.send(event.clone()).await.is_ok() {
                sent += 1;
            }
        }
        sent
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Number of rooms with at least one local socket
    pub fn room_count(&self) -> usize {
        self.room_sockets.len()
    }

    /// Number of local sockets subscribed to a room
    pub fn room_socket_count(&self, room_id: Snowflake) -> usize {
        self.room_sockets
            .get(&room_id)
            .map_or(0, |sockets| sockets.len())
    }

    /// Drop connections whose send channel has closed
    pub async fn cleanup_closed_connections(&self) -> usize {
        let closed: Vec<String> = self
            .connections
            .iter()
            .filter(|r| r.is_closed())
            .map(|r| r.key().clone())
            .collect();

        let count = closed.len();
        for socket_id in closed {
            self.remove_connection(&socket_id).await;
        }

        if count > 0 {
            tracing::info!(count, "Cleaned up closed connections");
        }
        count
    }
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("connections", &self.connections.len())
            .field("rooms", &self.room_sockets.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn add(manager: &ConnectionManager, socket: &str, user: i64) -> mpsc::Receiver<ServerEvent> {
        let (tx, rx) = mpsc::channel(8);
        manager.add_connection(
            socket.to_string(),
            format!("tok-{socket}"),
            Snowflake::new(user),
            tx,
        );
        rx
    }

    #[tokio::test]
    async fn test_add_remove_connection() {
        let manager = ConnectionManager::new();
        let _rx = add(&manager, "s1", 1);

        assert_eq!(manager.connection_count(), 1);
        manager.remove_connection("s1").await;
        assert_eq!(manager.connection_count(), 0);
    }

    #[tokio::test]
    async fn test_room_subscription() {
        let manager = ConnectionManager::new();
        let _rx = add(&manager, "s1", 1);

        let room = Snowflake::new(10);
        assert!(manager.join_room("s1", room).await);
        assert_eq!(manager.room_socket_count(room), 1);
        assert_eq!(manager.room_connections(room).len(), 1);

        assert!(manager.leave_room("s1", room).await);
        assert_eq!(manager.room_socket_count(room), 0);
        assert_eq!(manager.room_count(), 0);
    }

    #[tokio::test]
    async fn test_moving_rooms_drops_old_topic() {
        let manager = ConnectionManager::new();
        let _rx = add(&manager, "s1", 1);

        let room_a = Snowflake::new(10);
        let room_b = Snowflake::new(20);
        manager.join_room("s1", room_a).await;
        manager.join_room("s1", room_b).await;

        assert_eq!(manager.room_socket_count(room_a), 0);
        assert_eq!(manager.room_socket_count(room_b), 1);
    }

    #[tokio::test]
    async fn test_send_to_room_excludes_user() {
        let manager = ConnectionManager::new();
        let mut rx1 = add(&manager, "s1", 1);
        let mut rx2 = add(&manager, "s2", 2);

        let room = Snowflake::new(10);
        manager.join_room("s1", room).await;
        manager.join_room("s2", room).await;

        let sent = manager
            .send_to_room(
                room,
                ServerEvent::error("x", None, None),
                Some(Snowflake::new(1)),
            )
            .await;

        assert_eq!(sent, 1);
        assert!(rx1.try_recv().is_err());
        assert!(rx2.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_remove_connection_unsubscribes_room() {
        let manager = ConnectionManager::new();
        let _rx = add(&manager, "s1", 1);

        let room = Snowflake::new(10);
        manager.join_room("s1", room).await;
        manager.remove_connection("s1").await;

        assert_eq!(manager.room_socket_count(room), 0);
    }
}
