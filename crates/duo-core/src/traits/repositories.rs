//! Repository traits (ports) - define the interface for the durable store
//!
//! The domain layer defines what it needs; the infrastructure layer provides
//! the implementation. Roster mutations are deliberately expressed as
//! conditional single-document writes so that implementations can make them
//! atomic (the join capacity check must never be a read-then-write at the
//! application layer).

use async_trait::async_trait;

use crate::entities::{Message, Participant, Reaction, ReactionKind, Room, Session};
use crate::error::DomainError;
use crate::value_objects::{RoomCode, Snowflake};

/// Result type for repository operations
pub type RepoResult<T> = Result<T, DomainError>;

// ============================================================================
// Room Repository
// ============================================================================

#[async_trait]
pub trait RoomRepository: Send + Sync {
    /// Find room by ID, with its full participant roster
    async fn find_by_id(&self, id: Snowflake) -> RepoResult<Option<Room>>;

    /// Find room by code
    async fn find_by_code(&self, code: &RoomCode) -> RepoResult<Option<Room>>;

    /// Insert a new room; returns false if the code is already taken
    /// (the caller regenerates and retries)
    async fn try_create(&self, room: &Room) -> RepoResult<bool>;

    /// Atomically append a participant if the active roster is below
    /// `max_participants` and the room is still active.
    ///
    /// Returns false when there was no free slot. Implementations must make
    /// the capacity check and the insert a single conditional write.
    async fn append_participant_if_capacity(
        &self,
        room_id: Snowflake,
        participant: &Participant,
    ) -> RepoResult<bool>;

    /// Reactivate an inactive participant record (idempotent rejoin).
    /// Returns false if the user has no inactive record in the room.
    async fn reactivate_participant(
        &self,
        room_id: Snowflake,
        user_id: Snowflake,
    ) -> RepoResult<bool>;

    /// Mark a participant inactive, recording `left_at`.
    /// Returns false if the user has no active record in the room.
    async fn deactivate_participant(
        &self,
        room_id: Snowflake,
        user_id: Snowflake,
    ) -> RepoResult<bool>;

    /// Close the room if every participant is inactive. The check and the
    /// status transition are one conditional write; returns true only for
    /// the call that performed the transition.
    async fn close_if_all_inactive(&self, room_id: Snowflake) -> RepoResult<bool>;

    /// Explicitly close the room (idempotent). Returns true only for the
    /// call that performed the transition.
    async fn close(&self, room_id: Snowflake) -> RepoResult<bool>;
}

// ============================================================================
// Message Repository
// ============================================================================

/// Pagination options for message queries
#[derive(Debug, Clone, Default)]
pub struct MessageQuery {
    /// Fetch messages strictly older than this cursor
    pub before: Option<Snowflake>,
    /// Fetch messages strictly newer than this cursor
    pub after: Option<Snowflake>,
    pub limit: i64,
}

#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// Find message by ID, with its reactions
    async fn find_by_id(&self, id: Snowflake) -> RepoResult<Option<Message>>;

    /// List messages in a room with cursor pagination, newest first.
    /// Soft-deleted messages are included (their position is retained).
    async fn find_by_room(&self, room_id: Snowflake, query: MessageQuery)
        -> RepoResult<Vec<Message>>;

    /// Append a new message
    async fn create(&self, message: &Message) -> RepoResult<()>;

    /// Soft-delete: clear content, set the deletion flags, keep reactions.
    /// Returns false if the message does not exist or is already deleted.
    async fn soft_delete(
        &self,
        id: Snowflake,
        deleted_by: Snowflake,
        deleted_by_name: &str,
    ) -> RepoResult<bool>;

    /// The newest message in a room, if any
    async fn latest(&self, room_id: Snowflake) -> RepoResult<Option<Message>>;

    /// Add a reaction; returns false if (user, kind) already reacted
    async fn add_reaction(&self, message_id: Snowflake, reaction: &Reaction) -> RepoResult<bool>;

    /// Remove a reaction; returns false if it was not present (no-op)
    async fn remove_reaction(
        &self,
        message_id: Snowflake,
        user_id: Snowflake,
        kind: ReactionKind,
    ) -> RepoResult<bool>;

    /// All reactions on a message
    async fn find_reactions(&self, message_id: Snowflake) -> RepoResult<Vec<Reaction>>;
}

// ============================================================================
// Session Repository
// ============================================================================

#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Find session by its opaque token
    async fn find(&self, session_id: &str) -> RepoResult<Option<Session>>;

    /// Insert a session only if none exists for the token (first-writer-wins).
    /// Returns false when a concurrent caller already inserted one.
    async fn insert_if_absent(&self, session: &Session) -> RepoResult<bool>;

    /// Update online state and `last_seen`
    async fn set_online(&self, session_id: &str, is_online: bool) -> RepoResult<()>;

    /// Set or clear the session's current room
    async fn set_current_room(&self, session_id: &str, room_id: Option<Snowflake>)
        -> RepoResult<()>;

    /// Add a room to the chat history of every session owned by the user
    async fn add_history(&self, user_id: Snowflake, room_id: Snowflake) -> RepoResult<()>;

    /// Archive or unarchive a history entry (idempotent)
    async fn set_archived(
        &self,
        session_id: &str,
        room_id: Snowflake,
        archived: bool,
    ) -> RepoResult<()>;

    /// Remove a room from history and the archive (idempotent)
    async fn remove_history(&self, session_id: &str, room_id: Snowflake) -> RepoResult<()>;
}
