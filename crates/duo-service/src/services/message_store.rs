//! Message store service
//!
//! Append, paginate, soft-delete, and react to messages. Every operation
//! authorizes the caller against the durable roster before touching the
//! log.

use duo_core::{
    ContentType, DomainError, Message, MessagePage, MessageQuery, Reaction, ReactionKind, Snowflake,
};
use tracing::{info, instrument};

use super::context::ServiceContext;
use super::error::ServiceResult;
use super::room_registry::RoomRegistry;
use super::sanitize::sanitize_content;

/// Default page size for history queries
pub const DEFAULT_PAGE_SIZE: i64 = 50;
/// Largest page a client may request
pub const MAX_PAGE_SIZE: i64 = 100;

/// Message store service
pub struct MessageStore<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> MessageStore<'a> {
    /// Create a new MessageStore
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Append a message to a room's log
    #[instrument(skip(self, content))]
    pub async fn send_message(
        &self,
        room_id: Snowflake,
        sender_id: Snowflake,
        content: &str,
        content_type: ContentType,
    ) -> ServiceResult<Message> {
        let room = RoomRegistry::new(self.ctx)
            .authorize_member(room_id, sender_id)
            .await?;

        let sender_name = room
            .participant(sender_id)
            .map(|p| p.display_name.clone())
            .unwrap_or_default();

        let content = sanitize_content(content)?;
        let message = Message::new(
            self.ctx.generate_id(),
            room_id,
            sender_id,
            sender_name,
            content,
            content_type,
        );

        self.ctx.message_repo().create(&message).await?;
        info!(message_id = %message.id, room_id = %room_id, "Message stored");

        Ok(message)
    }

    /// List a page of a room's log, newest first
    ///
    /// Fetches one row past the requested limit to decide `has_more`
    /// without a second count query. Soft-deleted messages come back as
    /// tombstones in their original position.
    #[instrument(skip(self))]
    pub async fn list_messages(
        &self,
        room_id: Snowflake,
        user_id: Snowflake,
        before: Option<Snowflake>,
        after: Option<Snowflake>,
        limit: Option<i64>,
    ) -> ServiceResult<MessagePage> {
        RoomRegistry::new(self.ctx)
            .authorize_member(room_id, user_id)
            .await?;

        let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
        let query = MessageQuery {
            before,
            after,
            limit: limit + 1,
        };
        let forward = after.is_some() && before.is_none();

        let mut items = self.ctx.message_repo().find_by_room(room_id, query).await?;

        let has_more = items.len() as i64 > limit;
        if has_more {
            items.truncate(limit as usize);
        }

        // The `after` query scans oldest-first; flip it so every page
        // reads newest first
        if forward {
            items.reverse();
        }

        let next_cursor = if has_more || forward {
            items.last().map(|m| m.id)
        } else {
            None
        };
        let prev_cursor = items.first().map(|m| m.id);

        Ok(MessagePage {
            items,
            has_more,
            next_cursor,
            prev_cursor,
        })
    }

    /// Soft-delete a message, leaving a tombstone with its reactions
    ///
    /// Any active participant of the room may delete, matching the
    /// mutual-trust model of a two-person room. Deleting an already
    /// deleted message is a no-op that returns the tombstone.
    #[instrument(skip(self))]
    pub async fn delete_message(
        &self,
        message_id: Snowflake,
        user_id: Snowflake,
    ) -> ServiceResult<Message> {
        let message = self.require(message_id).await?;
        let room = RoomRegistry::new(self.ctx)
            .authorize_member(message.room_id, user_id)
            .await?;

        if message.is_deleted {
            return Ok(message);
        }

        let deleted_by_name = room
            .participant(user_id)
            .map(|p| p.display_name.clone())
            .unwrap_or_default();

        self.ctx
            .message_repo()
            .soft_delete(message_id, user_id, &deleted_by_name)
            .await?;

        info!(message_id = %message_id, user_id = %user_id, "Message soft-deleted");
        self.require(message_id).await
    }

    /// Add a reaction to a message
    ///
    /// Reactions attach to deleted messages too; only the content is gone.
    #[instrument(skip(self))]
    pub async fn add_reaction(
        &self,
        message_id: Snowflake,
        user_id: Snowflake,
        kind: ReactionKind,
    ) -> ServiceResult<Message> {
        let message = self.require(message_id).await?;
        RoomRegistry::new(self.ctx)
            .authorize_member(message.room_id, user_id)
            .await?;

        let reaction = Reaction::new(kind, user_id);
        if !self
            .ctx
            .message_repo()
            .add_reaction(message_id, &reaction)
            .await?
        {
            return Err(DomainError::DuplicateReaction.into());
        }

        self.require(message_id).await
    }

    /// Remove a reaction (idempotent)
    #[instrument(skip(self))]
    pub async fn remove_reaction(
        &self,
        message_id: Snowflake,
        user_id: Snowflake,
        kind: ReactionKind,
    ) -> ServiceResult<Message> {
        let message = self.require(message_id).await?;
        RoomRegistry::new(self.ctx)
            .authorize_member(message.room_id, user_id)
            .await?;

        self.ctx
            .message_repo()
            .remove_reaction(message_id, user_id, kind)
            .await?;

        self.require(message_id).await
    }

    /// The newest message in a room, if any
    #[instrument(skip(self))]
    pub async fn latest(
        &self,
        room_id: Snowflake,
        user_id: Snowflake,
    ) -> ServiceResult<Option<Message>> {
        RoomRegistry::new(self.ctx)
            .authorize_member(room_id, user_id)
            .await?;
        Ok(self.ctx.message_repo().latest(room_id).await?)
    }

    async fn require(&self, message_id: Snowflake) -> ServiceResult<Message> {
        self.ctx
            .message_repo()
            .find_by_id(message_id)
            .await?
            .ok_or_else(|| DomainError::MessageNotFound(message_id).into())
    }
}
