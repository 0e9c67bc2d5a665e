//! Individual WebSocket connection
//!
//! One connection per socket, authenticated at the handshake. The room
//! field tracks which broadcast topic the socket is subscribed to.

use crate::protocol::ServerEvent;
use duo_core::Snowflake;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, RwLock};

/// Connection lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Socket open, handshake not finished
    Unauthenticated,
    /// Session resolved, not in any room
    Authenticated,
    /// Subscribed to a room's broadcast topic
    InRoom(Snowflake),
    /// Socket is gone
    Disconnected,
}

/// A single WebSocket connection
pub struct Connection {
    /// Per-socket id, unique for the process lifetime
    socket_id: String,

    /// The session token this socket authenticated with
    session_id: String,

    /// The session's stable user id
    user_id: Snowflake,

    /// Display name the user carries into rooms
    display_name: RwLock<String>,

    /// Current lifecycle state
    state: RwLock<ConnectionState>,

    /// Channel to the socket's send task
    sender: mpsc::Sender<ServerEvent>,

    created_at: Instant,
}

impl Connection {
    /// Create a new authenticated connection
    pub fn new(
        socket_id: String,
        session_id: String,
        user_id: Snowflake,
        sender: mpsc::Sender<ServerEvent>,
    ) -> Arc<Self> {
        Arc::new(Self {
            socket_id,
            session_id,
            user_id,
            display_name: RwLock::new(String::new()),
            state: RwLock::new(ConnectionState::Authenticated),
            sender,
            created_at: Instant::now(),
        })
    }

    pub fn socket_id(&self) -> &str {
        &self.socket_id
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn user_id(&self) -> Snowflake {
        self.user_id
    }

    pub async fn display_name(&self) -> String {
        self.display_name.read().await.clone()
    }

    pub async fn set_display_name(&self, name: String) {
        *self.display_name.write().await = name;
    }

    pub async fn state(&self) -> ConnectionState {
        *self.state.read().await
    }

    pub async fn set_state(&self, state: ConnectionState) {
        *self.state.write().await = state;
    }

    /// The room this socket is subscribed to, if any
    pub async fn room_id(&self) -> Option<Snowflake> {
        match *self.state.read().await {
            ConnectionState::InRoom(room_id) => Some(room_id),
            _ => None,
        }
    }

    /// Get connection age
    pub fn age(&self) -> std::time::Duration {
        self.created_at.elapsed()
    }

    /// Send an event to this connection
    pub async fn send(&self, event: ServerEvent) -> Result<(), mpsc::error::SendError<ServerEvent>> {
        self.sender.send(event).await
    }

    /// Check if the socket's send channel is closed
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("socket_id", &self.socket_id)
            .field("user_id", &self.user_id)
            .field("created_at", &self.created_at)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connection_starts_authenticated() {
        let (tx, _rx) = mpsc::channel(8);
        let conn = Connection::new(
            "sock-1".to_string(),
            "tok-1".to_string(),
            Snowflake::new(42),
            tx,
        );

        assert_eq!(conn.socket_id(), "sock-1");
        assert_eq!(conn.session_id(), "tok-1");
        assert_eq!(conn.user_id(), Snowflake::new(42));
        assert_eq!(conn.state().await, ConnectionState::Authenticated);
        assert!(conn.room_id().await.is_none());
    }

    #[tokio::test]
    async fn test_room_state_transition() {
        let (tx, _rx) = mpsc::channel(8);
        let conn = Connection::new(
            "sock-1".to_string(),
            "tok-1".to_string(),
            Snowflake::new(42),
            tx,
        );

        let room = Snowflake::new(7);
        conn.set_state(ConnectionState::InRoom(room)).await;
        assert_eq!(conn.room_id().await, Some(room));

        conn.set_state(ConnectionState::Authenticated).await;
        assert!(conn.room_id().await.is_none());
    }

    #[tokio::test]
    async fn test_send_delivers_to_channel() {
        let (tx, mut rx) = mpsc::channel(8);
        let conn = Connection::new(
            "sock-1".to_string(),
            "tok-1".to_string(),
            Snowflake::new(42),
            tx,
        );

        conn.send(ServerEvent::error("oops", None, None))
            .await
            .unwrap();
        assert!(matches!(rx.recv().await, Some(ServerEvent::Error { .. })));
    }
}
