//! Message database models

use chrono::{DateTime, Utc};
use sqlx::FromRow;

use duo_core::{ContentType, DomainError, Message, Reaction, Snowflake};

/// Database model for the messages table
#[derive(Debug, Clone, FromRow)]
pub struct MessageModel {
    pub id: i64,
    pub room_id: i64,
    pub sender_id: i64,
    pub sender_name: String,
    pub content: String,
    pub content_type: String,
    pub is_deleted: bool,
    pub deleted_by: Option<i64>,
    pub deleted_by_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl MessageModel {
    /// Convert into a domain entity, attaching its reactions
    pub fn into_entity(self, reactions: Vec<ReactionModel>) -> Result<Message, DomainError> {
        let content_type = match self.content_type.as_str() {
            "text" => ContentType::Text,
            "emoji" => ContentType::Emoji,
            other => {
                return Err(DomainError::InternalError(format!(
                    "unknown content type: {other}"
                )))
            }
        };

        let reactions = reactions
            .into_iter()
            .map(ReactionModel::into_entity)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Message {
            id: Snowflake::new(self.id),
            room_id: Snowflake::new(self.room_id),
            sender_id: Snowflake::new(self.sender_id),
            sender_name: self.sender_name,
            content: self.content,
            content_type,
            is_deleted: self.is_deleted,
            deleted_by: self.deleted_by.map(Snowflake::new),
            deleted_by_name: self.deleted_by_name,
            reactions,
            created_at: self.created_at,
        })
    }
}

/// Database model for the message_reactions table
#[derive(Debug, Clone, FromRow)]
pub struct ReactionModel {
    pub message_id: i64,
    pub user_id: i64,
    pub kind: String,
    pub created_at: DateTime<Utc>,
}

impl ReactionModel {
    /// Convert into a domain entity
    pub fn into_entity(self) -> Result<Reaction, DomainError> {
        let kind = self
            .kind
            .parse()
            .map_err(|e: String| DomainError::InternalError(e))?;

        Ok(Reaction {
            kind,
            user_id: Snowflake::new(self.user_id),
            created_at: self.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use duo_core::ReactionKind;

    #[test]
    fn test_into_entity_with_reactions() {
        let model = MessageModel {
            id: 1,
            room_id: 2,
            sender_id: 3,
            sender_name: "alice".to_string(),
            content: "hi".to_string(),
            content_type: "text".to_string(),
            is_deleted: false,
            deleted_by: None,
            deleted_by_name: None,
            created_at: Utc::now(),
        };

        let reactions = vec![ReactionModel {
            message_id: 1,
            user_id: 4,
            kind: "like".to_string(),
            created_at: Utc::now(),
        }];

        let msg = model.into_entity(reactions).unwrap();
        assert_eq!(msg.reactions.len(), 1);
        assert_eq!(msg.reactions[0].kind, ReactionKind::Like);
        assert_eq!(msg.content_type, ContentType::Text);
    }

    #[test]
    fn test_corrupt_reaction_kind_is_rejected() {
        let model = ReactionModel {
            message_id: 1,
            user_id: 4,
            kind: "thumbsdown".to_string(),
            created_at: Utc::now(),
        };
        assert!(model.into_entity().is_err());
    }
}
