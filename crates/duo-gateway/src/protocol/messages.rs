//! Client and server event types
//!
//! Every frame is a JSON object `{"event": "...", "data": {...}}`. The
//! event name doubles as the rate-limit bucket key.

use duo_core::{ContentType, Message, Participant, Reaction, ReactionKind, Snowflake};
use serde::{Deserialize, Serialize};

/// Events the client may send
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientEvent {
    JoinRoom {
        room_id: Snowflake,
    },
    LeaveRoom {
        room_id: Snowflake,
    },
    SendMessage {
        room_id: Snowflake,
        content: String,
        #[serde(default)]
        content_type: ContentType,
    },
    Typing {
        room_id: Snowflake,
        is_typing: bool,
    },
    AddReaction {
        message_id: Snowflake,
        kind: ReactionKind,
    },
    RemoveReaction {
        message_id: Snowflake,
        kind: ReactionKind,
    },
    DeleteMessage {
        message_id: Snowflake,
    },
}

impl ClientEvent {
    /// Stable name, used for logging and rate-limit buckets
    pub fn name(&self) -> &'static str {
        match self {
            Self::JoinRoom { .. } => "join_room",
            Self::LeaveRoom { .. } => "leave_room",
            Self::SendMessage { .. } => "send_message",
            Self::Typing { .. } => "typing",
            Self::AddReaction { .. } => "add_reaction",
            Self::RemoveReaction { .. } => "remove_reaction",
            Self::DeleteMessage { .. } => "delete_message",
        }
    }

    /// Parse a client frame
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

/// Events the server sends
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    RoomJoined {
        room_id: Snowflake,
        user_id: Snowflake,
        room_code: String,
        participants: Vec<Participant>,
        recent_messages: Vec<Message>,
    },
    UserJoined {
        room_id: Snowflake,
        user_id: Snowflake,
        display_name: String,
    },
    UserLeft {
        room_id: Snowflake,
        user_id: Snowflake,
    },
    ParticipantsUpdated {
        room_id: Snowflake,
        participants: Vec<Participant>,
    },
    NewMessage {
        message: Message,
    },
    UserTyping {
        room_id: Snowflake,
        user_id: Snowflake,
        is_typing: bool,
    },
    MessageDeleted {
        message_id: Snowflake,
        room_id: Snowflake,
        deleted_by: Snowflake,
        placeholder: String,
    },
    ReactionUpdated {
        message_id: Snowflake,
        room_id: Snowflake,
        reactions: Vec<Reaction>,
    },
    RoomClosed {
        room_id: Snowflake,
        reason: String,
    },
    Error {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        code: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        retry_after: Option<u64>,
    },
}

impl ServerEvent {
    /// Stable name, used for logging and pub/sub event typing
    pub fn name(&self) -> &'static str {
        match self {
            Self::RoomJoined { .. } => "room_joined",
            Self::UserJoined { .. } => "user_joined",
            Self::UserLeft { .. } => "user_left",
            Self::ParticipantsUpdated { .. } => "participants_updated",
            Self::NewMessage { .. } => "new_message",
            Self::UserTyping { .. } => "user_typing",
            Self::MessageDeleted { .. } => "message_deleted",
            Self::ReactionUpdated { .. } => "reaction_updated",
            Self::RoomClosed { .. } => "room_closed",
            Self::Error { .. } => "error",
        }
    }

    /// Build an error event
    pub fn error(message: impl Into<String>, code: Option<String>, retry_after: Option<u64>) -> Self {
        Self::Error {
            message: message.into(),
            code,
            retry_after,
        }
    }

    /// Serialize to a JSON frame
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_event_parsing() {
        let json = r#"{"event":"join_room","data":{"room_id":"123"}}"#;
        let event = ClientEvent::from_json(json).unwrap();
        assert_eq!(
            event,
            ClientEvent::JoinRoom {
                room_id: Snowflake::new(123)
            }
        );
        assert_eq!(event.name(), "join_room");
    }

    #[test]
    fn test_send_message_defaults_to_text() {
        let json = r#"{"event":"send_message","data":{"room_id":"1","content":"hi"}}"#;
        let event = ClientEvent::from_json(json).unwrap();
        assert!(matches!(
            event,
            ClientEvent::SendMessage {
                content_type: ContentType::Text,
                ..
            }
        ));
    }

    #[test]
    fn test_reaction_kind_on_the_wire() {
        let json = r#"{"event":"add_reaction","data":{"message_id":"9","kind":"love"}}"#;
        let event = ClientEvent::from_json(json).unwrap();
        assert_eq!(
            event,
            ClientEvent::AddReaction {
                message_id: Snowflake::new(9),
                kind: ReactionKind::Love,
            }
        );
    }

    #[test]
    fn test_unknown_event_is_rejected() {
        assert!(ClientEvent::from_json(r#"{"event":"identify","data":{}}"#).is_err());
        assert!(ClientEvent::from_json("not json").is_err());
    }

    #[test]
    fn test_error_event_skips_empty_fields() {
        let event = ServerEvent::error("boom", None, None);
        let json = event.to_json().unwrap();
        assert!(!json.contains("code"));
        assert!(!json.contains("retry_after"));

        let event = ServerEvent::error("slow down", Some("RATE_LIMIT".into()), Some(7));
        let json = event.to_json().unwrap();
        assert!(json.contains(r#""code":"RATE_LIMIT""#));
        assert!(json.contains(r#""retry_after":7"#));
    }

    #[test]
    fn test_server_event_round_trip() {
        let event = ServerEvent::UserTyping {
            room_id: Snowflake::new(5),
            user_id: Snowflake::new(6),
            is_typing: true,
        };
        let json = event.to_json().unwrap();
        assert!(json.contains(r#""event":"user_typing""#));

        let parsed: ServerEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.name(), "user_typing");
    }
}
