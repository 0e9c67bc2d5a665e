//! Room database models

use chrono::{DateTime, Utc};
use sqlx::FromRow;

use duo_core::{DomainError, Participant, Room, RoomCode, RoomStatus, Snowflake};

/// Database model for the rooms table
#[derive(Debug, Clone, FromRow)]
pub struct RoomModel {
    pub id: i64,
    pub code: String,
    pub max_participants: i32,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl RoomModel {
    /// Check if room is closed
    #[inline]
    pub fn is_closed(&self) -> bool {
        self.status == "closed"
    }

    /// Convert into a domain entity, attaching the participant roster
    pub fn into_entity(self, participants: Vec<ParticipantModel>) -> Result<Room, DomainError> {
        let code = RoomCode::parse(&self.code)
            .map_err(|e| DomainError::InternalError(format!("corrupt room code: {e}")))?;

        let status = match self.status.as_str() {
            "active" => RoomStatus::Active,
            "closed" => RoomStatus::Closed,
            other => {
                return Err(DomainError::InternalError(format!(
                    "unknown room status: {other}"
                )))
            }
        };

        Ok(Room {
            id: Snowflake::new(self.id),
            code,
            participants: participants.into_iter().map(Participant::from).collect(),
            max_participants: usize::try_from(self.max_participants).unwrap_or(2),
            status,
            created_at: self.created_at,
            closed_at: self.closed_at,
            expires_at: self.expires_at,
        })
    }
}

/// Database model for the room_participants table
#[derive(Debug, Clone, FromRow)]
pub struct ParticipantModel {
    pub room_id: i64,
    pub user_id: i64,
    pub display_name: String,
    pub joined_at: DateTime<Utc>,
    pub is_active: bool,
    pub left_at: Option<DateTime<Utc>>,
}

impl From<ParticipantModel> for Participant {
    fn from(model: ParticipantModel) -> Self {
        Self {
            user_id: Snowflake::new(model.user_id),
            display_name: model.display_name,
            joined_at: model.joined_at,
            is_active: model.is_active,
            left_at: model.left_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn room_model(status: &str) -> RoomModel {
        RoomModel {
            id: 1,
            code: "ABC123".to_string(),
            max_participants: 2,
            status: status.to_string(),
            created_at: Utc::now(),
            closed_at: None,
            expires_at: None,
        }
    }

    #[test]
    fn test_into_entity() {
        let participants = vec![ParticipantModel {
            room_id: 1,
            user_id: 10,
            display_name: "alice".to_string(),
            joined_at: Utc::now(),
            is_active: true,
            left_at: None,
        }];

        let room = room_model("active").into_entity(participants).unwrap();
        assert_eq!(room.id, Snowflake::new(1));
        assert_eq!(room.status, RoomStatus::Active);
        assert_eq!(room.active_count(), 1);
    }

    #[test]
    fn test_unknown_status_is_rejected() {
        assert!(room_model("paused").into_entity(Vec::new()).is_err());
    }
}
