//! Session entity - a client's persistent anonymous identity
//!
//! A session is created on first contact from a client-supplied opaque
//! token. The user id is minted lazily and assigned at most once
//! (first-writer-wins); the socket binding changes on every connect.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::value_objects::Snowflake;

/// Session entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Client-supplied opaque token, unique
    pub session_id: String,
    /// Stable user id for the session's lifetime
    pub user_id: Snowflake,
    /// The one active socket, if connected
    pub socket_id: Option<String>,
    pub current_room_id: Option<Snowflake>,
    pub is_online: bool,
    pub last_seen: DateTime<Utc>,
    /// Room ids this session has chatted in
    pub chat_history: HashSet<Snowflake>,
    /// Subset of `chat_history` the user archived
    pub archived_chats: HashSet<Snowflake>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// Create a new session with a freshly minted user id
    pub fn new(session_id: String, user_id: Snowflake) -> Self {
        let now = Utc::now();
        Self {
            session_id,
            user_id,
            socket_id: None,
            current_room_id: None,
            is_online: false,
            last_seen: now,
            chat_history: HashSet::new(),
            archived_chats: HashSet::new(),
            created_at: now,
        }
    }

    /// Bind the session's active socket
    pub fn connect(&mut self, socket_id: String) {
        self.socket_id = Some(socket_id);
        self.is_online = true;
        self.touch();
    }

    /// Clear the socket binding on disconnect
    pub fn disconnect(&mut self) {
        self.socket_id = None;
        self.is_online = false;
        self.touch();
    }

    /// Record a room in this session's chat history (idempotent)
    pub fn add_to_history(&mut self, room_id: Snowflake) {
        self.chat_history.insert(room_id);
    }

    /// Archive a room; only rooms in history can be archived
    pub fn archive(&mut self, room_id: Snowflake) -> bool {
        if self.chat_history.contains(&room_id) {
            self.archived_chats.insert(room_id)
        } else {
            false
        }
    }

    /// Unarchive a room (idempotent)
    pub fn unarchive(&mut self, room_id: Snowflake) {
        self.archived_chats.remove(&room_id);
    }

    /// Drop a room from history and the archive
    pub fn remove_from_history(&mut self, room_id: Snowflake) {
        self.chat_history.remove(&room_id);
        self.archived_chats.remove(&room_id);
    }

    /// Update last activity timestamp
    pub fn touch(&mut self) {
        self.last_seen = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        Session::new("tok-abc".to_string(), Snowflake::new(42))
    }

    #[test]
    fn test_connect_disconnect() {
        let mut s = session();
        assert!(!s.is_online);

        s.connect("sock-1".to_string());
        assert!(s.is_online);
        assert_eq!(s.socket_id.as_deref(), Some("sock-1"));

        s.disconnect();
        assert!(!s.is_online);
        assert!(s.socket_id.is_none());
    }

    #[test]
    fn test_history_is_idempotent() {
        let mut s = session();
        let room = Snowflake::new(7);

        s.add_to_history(room);
        s.add_to_history(room);
        assert_eq!(s.chat_history.len(), 1);
    }

    #[test]
    fn test_archive_requires_history() {
        let mut s = session();
        let room = Snowflake::new(7);

        assert!(!s.archive(room));

        s.add_to_history(room);
        assert!(s.archive(room));
        assert!(s.archived_chats.contains(&room));

        s.unarchive(room);
        assert!(!s.archived_chats.contains(&room));
    }

    #[test]
    fn test_remove_from_history_clears_archive() {
        let mut s = session();
        let room = Snowflake::new(7);

        s.add_to_history(room);
        s.archive(room);
        s.remove_from_history(room);

        assert!(s.chat_history.is_empty());
        assert!(s.archived_chats.is_empty());
    }
}
