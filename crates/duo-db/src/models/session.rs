//! Session database models
//!
//! The socket binding is runtime state held in the cache layer; only the
//! durable session fields live here.

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use std::collections::HashSet;

use duo_core::{Session, Snowflake};

/// Database model for the sessions table
#[derive(Debug, Clone, FromRow)]
pub struct SessionModel {
    pub session_id: String,
    pub user_id: i64,
    pub current_room_id: Option<i64>,
    pub is_online: bool,
    pub last_seen: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Database model for the session_history table
#[derive(Debug, Clone, FromRow)]
pub struct HistoryModel {
    pub room_id: i64,
    pub archived: bool,
}

impl SessionModel {
    /// Convert into a domain entity, attaching its chat history
    pub fn into_entity(self, history: Vec<HistoryModel>) -> Session {
        let mut chat_history = HashSet::with_capacity(history.len());
        let mut archived_chats = HashSet::new();

        for row in history {
            let room_id = Snowflake::new(row.room_id);
            chat_history.insert(room_id);
            if row.archived {
                archived_chats.insert(room_id);
            }
        }

        Session {
            session_id: self.session_id,
            user_id: Snowflake::new(self.user_id),
            socket_id: None,
            current_room_id: self.current_room_id.map(Snowflake::new),
            is_online: self.is_online,
            last_seen: self.last_seen,
            chat_history,
            archived_chats,
            created_at: self.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_entity_splits_archive() {
        let model = SessionModel {
            session_id: "tok-1".to_string(),
            user_id: 42,
            current_room_id: None,
            is_online: true,
            last_seen: Utc::now(),
            created_at: Utc::now(),
        };

        let history = vec![
            HistoryModel { room_id: 1, archived: false },
            HistoryModel { room_id: 2, archived: true },
        ];

        let session = model.into_entity(history);
        assert_eq!(session.chat_history.len(), 2);
        assert_eq!(session.archived_chats.len(), 1);
        assert!(session.archived_chats.contains(&Snowflake::new(2)));
        assert!(session.socket_id.is_none());
    }
}
