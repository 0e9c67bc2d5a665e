//! Room entity - a two-party chat session identified by a shareable code

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::value_objects::{RoomCode, Snowflake};

/// Default participant capacity of a room
pub const DEFAULT_MAX_PARTICIPANTS: usize = 2;

/// Room lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomStatus {
    /// Room accepts joins and messages
    Active,
    /// Room is closed; no joins or messages are accepted
    Closed,
}

/// A user's membership record within a room
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub user_id: Snowflake,
    pub display_name: String,
    pub joined_at: DateTime<Utc>,
    pub is_active: bool,
    pub left_at: Option<DateTime<Utc>>,
}

impl Participant {
    /// Create a new active participant
    pub fn new(user_id: Snowflake, display_name: String) -> Self {
        Self {
            user_id,
            display_name,
            joined_at: Utc::now(),
            is_active: true,
            left_at: None,
        }
    }

    /// Mark the participant inactive, recording when they left
    pub fn deactivate(&mut self) {
        self.is_active = false;
        self.left_at = Some(Utc::now());
    }

    /// Reactivate an inactive participant (idempotent rejoin)
    pub fn reactivate(&mut self) {
        self.is_active = true;
        self.left_at = None;
    }
}

/// Room entity
///
/// Invariants: at most `max_participants` entries in `participants`, at most
/// one entry per user id, and `status` is `Closed` once every participant
/// has gone inactive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub id: Snowflake,
    pub code: RoomCode,
    pub participants: Vec<Participant>,
    pub max_participants: usize,
    pub status: RoomStatus,
    pub created_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Room {
    /// Create a new active room with its creator as the first participant
    pub fn new(id: Snowflake, code: RoomCode, creator: Participant, ttl_hours: Option<i64>) -> Self {
        let created_at = Utc::now();
        Self {
            id,
            code,
            participants: vec![creator],
            max_participants: DEFAULT_MAX_PARTICIPANTS,
            status: RoomStatus::Active,
            created_at,
            closed_at: None,
            expires_at: ttl_hours.map(|h| created_at + Duration::hours(h)),
        }
    }

    /// Count of currently active participants
    pub fn active_count(&self) -> usize {
        self.participants.iter().filter(|p| p.is_active).count()
    }

    /// Check if the room has no free slot for a new participant
    #[inline]
    pub fn is_full(&self) -> bool {
        self.active_count() >= self.max_participants
    }

    /// Check if the room is closed
    #[inline]
    pub fn is_closed(&self) -> bool {
        self.status == RoomStatus::Closed
    }

    /// Check if the room has passed its expiry deadline
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Utc::now() > at)
    }

    /// Find a participant record for a user (active or not)
    pub fn participant(&self, user_id: Snowflake) -> Option<&Participant> {
        self.participants.iter().find(|p| p.user_id == user_id)
    }

    /// Check if the user has a participant record in this room
    #[inline]
    pub fn has_participant(&self, user_id: Snowflake) -> bool {
        self.participant(user_id).is_some()
    }

    /// Check if the user is an *active* participant
    pub fn has_active_participant(&self, user_id: Snowflake) -> bool {
        self.participant(user_id).is_some_and(|p| p.is_active)
    }

    /// A room should close once everyone who joined has gone inactive
    pub fn should_close(&self) -> bool {
        !self.participants.is_empty() && self.participants.iter().all(|p| !p.is_active)
    }

    /// Transition the room to closed (idempotent)
    pub fn close(&mut self) {
        if self.status != RoomStatus::Closed {
            self.status = RoomStatus::Closed;
            self.closed_at = Some(Utc::now());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn room_with_one(user_id: i64) -> Room {
        Room::new(
            Snowflake::new(1),
            RoomCode::parse("ABC123").unwrap(),
            Participant::new(Snowflake::new(user_id), "alice".to_string()),
            None,
        )
    }

    #[test]
    fn test_new_room_has_creator() {
        let room = room_with_one(10);
        assert_eq!(room.active_count(), 1);
        assert!(room.has_participant(Snowflake::new(10)));
        assert!(!room.is_full());
        assert!(!room.is_closed());
        assert!(!room.should_close());
    }

    #[test]
    fn test_room_full_at_two_active() {
        let mut room = room_with_one(10);
        room.participants
            .push(Participant::new(Snowflake::new(20), "bob".to_string()));
        assert!(room.is_full());
        assert_eq!(room.active_count(), 2);
    }

    #[test]
    fn test_inactive_participant_frees_slot() {
        let mut room = room_with_one(10);
        room.participants
            .push(Participant::new(Snowflake::new(20), "bob".to_string()));
        room.participants[1].deactivate();
        assert!(!room.is_full());
        assert!(room.has_participant(Snowflake::new(20)));
        assert!(!room.has_active_participant(Snowflake::new(20)));
    }

    #[test]
    fn test_should_close_when_all_inactive() {
        let mut room = room_with_one(10);
        room.participants
            .push(Participant::new(Snowflake::new(20), "bob".to_string()));

        room.participants[1].deactivate();
        assert!(!room.should_close());

        room.participants[0].deactivate();
        assert!(room.should_close());
    }

    #[test]
    fn test_close_is_idempotent() {
        let mut room = room_with_one(10);
        room.close();
        assert!(room.is_closed());
        let first_closed_at = room.closed_at;

        room.close();
        assert_eq!(room.closed_at, first_closed_at);
    }

    #[test]
    fn test_reactivate_clears_left_at() {
        let mut p = Participant::new(Snowflake::new(10), "alice".to_string());
        p.deactivate();
        assert!(p.left_at.is_some());

        p.reactivate();
        assert!(p.is_active);
        assert!(p.left_at.is_none());
    }

    #[test]
    fn test_expiry() {
        let mut room = room_with_one(10);
        assert!(!room.is_expired());

        room.expires_at = Some(Utc::now() - Duration::hours(1));
        assert!(room.is_expired());
    }
}
