//! Message entity - a chat message within a room
//!
//! Messages are append-only; deletion is a soft delete that clears content
//! but keeps the message's position in the log and its reactions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value_objects::Snowflake;

/// Message content kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    #[default]
    Text,
    Emoji,
}

/// Closed set of reaction kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReactionKind {
    Like,
    Love,
    Laugh,
    Wow,
    Sad,
    Angry,
}

impl ReactionKind {
    /// Canonical lowercase name, as stored and sent over the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Like => "like",
            Self::Love => "love",
            Self::Laugh => "laugh",
            Self::Wow => "wow",
            Self::Sad => "sad",
            Self::Angry => "angry",
        }
    }
}

impl std::fmt::Display for ReactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ReactionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "like" => Ok(Self::Like),
            "love" => Ok(Self::Love),
            "laugh" => Ok(Self::Laugh),
            "wow" => Ok(Self::Wow),
            "sad" => Ok(Self::Sad),
            "angry" => Ok(Self::Angry),
            _ => Err(format!("unknown reaction kind: {s}")),
        }
    }
}

/// A single user's reaction on a message
///
/// At most one reaction per (message, user, kind).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reaction {
    pub kind: ReactionKind,
    pub user_id: Snowflake,
    pub created_at: DateTime<Utc>,
}

impl Reaction {
    pub fn new(kind: ReactionKind, user_id: Snowflake) -> Self {
        Self {
            kind,
            user_id,
            created_at: Utc::now(),
        }
    }
}

/// Message entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Time-ordered id, doubles as the pagination cursor
    pub id: Snowflake,
    pub room_id: Snowflake,
    pub sender_id: Snowflake,
    pub sender_name: String,
    pub content: String,
    pub content_type: ContentType,
    pub is_deleted: bool,
    pub deleted_by: Option<Snowflake>,
    pub deleted_by_name: Option<String>,
    pub reactions: Vec<Reaction>,
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Create a new message
    pub fn new(
        id: Snowflake,
        room_id: Snowflake,
        sender_id: Snowflake,
        sender_name: String,
        content: String,
        content_type: ContentType,
    ) -> Self {
        Self {
            id,
            room_id,
            sender_id,
            sender_name,
            content,
            content_type,
            is_deleted: false,
            deleted_by: None,
            deleted_by_name: None,
            reactions: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Soft-delete: clear content but keep the log position and reactions
    pub fn soft_delete(&mut self, deleted_by: Snowflake, deleted_by_name: String) {
        self.content.clear();
        self.is_deleted = true;
        self.deleted_by = Some(deleted_by);
        self.deleted_by_name = Some(deleted_by_name);
    }

    /// Check if a user already reacted with the given kind
    pub fn has_reaction(&self, user_id: Snowflake, kind: ReactionKind) -> bool {
        self.reactions
            .iter()
            .any(|r| r.user_id == user_id && r.kind == kind)
    }

    /// Check if message content is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.content.trim().is_empty()
    }
}

/// One page of a room's message log, newest first
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagePage {
    pub items: Vec<Message>,
    pub has_more: bool,
    /// Cursor for the next (older) page
    pub next_cursor: Option<Snowflake>,
    /// Cursor for the previous (newer) page
    pub prev_cursor: Option<Snowflake>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message() -> Message {
        Message::new(
            Snowflake::new(1),
            Snowflake::new(100),
            Snowflake::new(200),
            "alice".to_string(),
            "Hello, world!".to_string(),
            ContentType::Text,
        )
    }

    #[test]
    fn test_message_creation() {
        let msg = message();
        assert!(!msg.is_deleted);
        assert!(!msg.is_empty());
        assert!(msg.reactions.is_empty());
    }

    #[test]
    fn test_soft_delete_clears_content_keeps_reactions() {
        let mut msg = message();
        msg.reactions
            .push(Reaction::new(ReactionKind::Like, Snowflake::new(300)));

        msg.soft_delete(Snowflake::new(300), "bob".to_string());

        assert!(msg.is_deleted);
        assert_eq!(msg.content, "");
        assert_eq!(msg.deleted_by, Some(Snowflake::new(300)));
        assert_eq!(msg.deleted_by_name.as_deref(), Some("bob"));
        assert_eq!(msg.reactions.len(), 1);
    }

    #[test]
    fn test_has_reaction() {
        let mut msg = message();
        let user = Snowflake::new(300);
        msg.reactions.push(Reaction::new(ReactionKind::Love, user));

        assert!(msg.has_reaction(user, ReactionKind::Love));
        assert!(!msg.has_reaction(user, ReactionKind::Like));
        assert!(!msg.has_reaction(Snowflake::new(400), ReactionKind::Love));
    }

    #[test]
    fn test_reaction_kind_round_trip() {
        for kind in [
            ReactionKind::Like,
            ReactionKind::Love,
            ReactionKind::Laugh,
            ReactionKind::Wow,
            ReactionKind::Sad,
            ReactionKind::Angry,
        ] {
            let parsed: ReactionKind = kind.as_str().parse().unwrap();
            assert_eq!(parsed, kind);
        }
        assert!("thumbsdown".parse::<ReactionKind>().is_err());
    }
}
