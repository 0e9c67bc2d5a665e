//! Room registry service
//!
//! Creates, joins, leaves, and closes rooms. Reads go cache-aside through
//! the room snapshot cache; every membership decision is made against the
//! durable roster, never against a cached copy.

use duo_core::{DomainError, Participant, Room, RoomCode, Snowflake};
use tracing::{info, instrument, warn};

use super::context::ServiceContext;
use super::error::{ServiceError, ServiceResult};

/// Attempts to find an unclaimed code before giving up
const CODE_RETRY_LIMIT: usize = 5;

/// Result of a join: the refreshed room plus how the user got in
#[derive(Debug, Clone)]
pub struct JoinOutcome {
    pub room: Room,
    /// True when the user re-entered via an existing participant record
    pub rejoined: bool,
}

/// Result of a leave: the refreshed room plus whether it closed
#[derive(Debug, Clone)]
pub struct LeaveOutcome {
    pub room: Room,
    /// True when this leave emptied the room and closed it
    pub closed: bool,
}

/// Room registry service
pub struct RoomRegistry<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> RoomRegistry<'a> {
    /// Create a new RoomRegistry
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Create a room with the caller as its first participant
    #[instrument(skip(self, display_name))]
    pub async fn create_room(
        &self,
        creator_id: Snowflake,
        display_name: &str,
    ) -> ServiceResult<Room> {
        let creator = Participant::new(creator_id, display_name.to_string());
        let ttl_hours = self.ctx.room_config().ttl_hours;

        for attempt in 0..CODE_RETRY_LIMIT {
            let code = RoomCode::generate();
            let room = Room::new(self.ctx.generate_id(), code, creator.clone(), ttl_hours);

            if self.ctx.room_repo().try_create(&room).await? {
                info!(room_id = %room.id, code = %room.code, "Room created");
                self.ctx.room_cache().put(&room).await;
                self.ctx.history().record_chat(creator_id, room.id).await?;
                return Ok(room);
            }

            warn!(attempt, "Room code collision, regenerating");
        }

        Err(ServiceError::internal(
            "could not find an unclaimed room code",
        ))
    }

    /// Join a room by code
    ///
    /// A user with an inactive participant record re-enters through it;
    /// anyone else takes a free slot if one remains. Both paths go through
    /// conditional writes on the durable roster so two concurrent joiners
    /// cannot both claim the last slot.
    #[instrument(skip(self, display_name))]
    pub async fn join_room(
        &self,
        code: &RoomCode,
        user_id: Snowflake,
        display_name: &str,
    ) -> ServiceResult<JoinOutcome> {
        let room = self
            .get_room_by_code(code)
            .await?
            .ok_or(DomainError::RoomNotFound)?;

        if room.is_closed() || room.is_expired() {
            return Err(DomainError::RoomClosed.into());
        }

        let rejoined = if room.has_participant(user_id) {
            // Re-entry; reactivation of an already-active record is a no-op
            if !room.has_active_participant(user_id)
                && !self
                    .ctx
                    .room_repo()
                    .reactivate_participant(room.id, user_id)
                    .await?
            {
                return Err(DomainError::RoomFull.into());
            }
            true
        } else {
            let participant = Participant::new(user_id, display_name.to_string());
            if !self
                .ctx
                .room_repo()
                .append_participant_if_capacity(room.id, &participant)
                .await?
            {
                return Err(DomainError::RoomFull.into());
            }
            false
        };

        let room = self.refresh(room.id).await?;
        self.ctx.history().record_chat(user_id, room.id).await?;

        info!(room_id = %room.id, user_id = %user_id, rejoined, "User joined room");

        Ok(JoinOutcome { room, rejoined })
    }

    /// Leave a room; closes the room when the last active participant goes
    #[instrument(skip(self))]
    pub async fn leave_room(
        &self,
        room_id: Snowflake,
        user_id: Snowflake,
    ) -> ServiceResult<LeaveOutcome> {
        if !self
            .ctx
            .room_repo()
            .deactivate_participant(room_id, user_id)
            .await?
        {
            return Err(DomainError::UserNotInRoom.into());
        }

        let closed = self.ctx.room_repo().close_if_all_inactive(room_id).await?;
        let room = self.refresh(room_id).await?;

        if closed {
            info!(room_id = %room_id, "Room closed, everyone left");
            self.ctx.room_cache().invalidate(room_id, &room.code).await;
            self.ctx.session_cache().clear_presence(room_id).await;
        }

        Ok(LeaveOutcome { room, closed })
    }

    /// Explicitly close a room on behalf of one of its participants
    ///
    /// Any participant record qualifies, active or not; a room's own
    /// members may always end it. Closing an already-closed room is a
    /// no-op that returns the room as it stands.
    #[instrument(skip(self))]
    pub async fn close_room(&self, user_id: Snowflake, room_id: Snowflake) -> ServiceResult<Room> {
        let room = self
            .ctx
            .room_repo()
            .find_by_id(room_id)
            .await?
            .ok_or(DomainError::RoomNotFound)?;

        if !room.has_participant(user_id) {
            return Err(DomainError::UserNotInRoom.into());
        }
        if room.is_closed() {
            return Ok(room);
        }

        self.ctx.room_repo().close(room_id).await?;
        let room = self.refresh(room_id).await?;

        self.ctx.room_cache().invalidate(room_id, &room.code).await;
        self.ctx.session_cache().clear_presence(room_id).await;

        info!(room_id = %room_id, user_id = %user_id, "Room closed");
        Ok(room)
    }

    /// Look up a room by id, cache-aside
    #[instrument(skip(self))]
    pub async fn get_room(&self, room_id: Snowflake) -> ServiceResult<Option<Room>> {
        if let Some(room) = self.ctx.room_cache().get(room_id).await {
            return Ok(Some(room));
        }

        let room = self.ctx.room_repo().find_by_id(room_id).await?;
        if let Some(ref room) = room {
            self.ctx.room_cache().put(room).await;
        }
        Ok(room)
    }

    /// Look up a room by code, cache-aside
    #[instrument(skip(self))]
    pub async fn get_room_by_code(&self, code: &RoomCode) -> ServiceResult<Option<Room>> {
        if let Some(room) = self.ctx.room_cache().get_by_code(code).await {
            return Ok(Some(room));
        }

        let room = self.ctx.room_repo().find_by_code(code).await?;
        if let Some(ref room) = room {
            self.ctx.room_cache().put(room).await;
        }
        Ok(room)
    }

    /// Require that a user is an active participant of an open room
    ///
    /// Always reads the durable roster; the snapshot cache is never
    /// trusted for authorization.
    #[instrument(skip(self))]
    pub async fn authorize_member(
        &self,
        room_id: Snowflake,
        user_id: Snowflake,
    ) -> ServiceResult<Room> {
        let room = self
            .ctx
            .room_repo()
            .find_by_id(room_id)
            .await?
            .ok_or(DomainError::RoomNotFound)?;

        if room.is_closed() {
            return Err(DomainError::RoomClosed.into());
        }
        if !room.has_active_participant(user_id) {
            return Err(DomainError::UserNotInRoom.into());
        }

        Ok(room)
    }

    /// Re-read a room from the durable store and refresh its snapshot
    async fn refresh(&self, room_id: Snowflake) -> ServiceResult<Room> {
        let room = self
            .ctx
            .room_repo()
            .find_by_id(room_id)
            .await?
            .ok_or(DomainError::RoomNotFound)?;

        self.ctx.room_cache().put(&room).await;
        Ok(room)
    }
}
