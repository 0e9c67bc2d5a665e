//! Reaction handlers
//!
//! Reactions carry only a message id; the room is resolved from the
//! message before membership is checked.

use crate::connection::Connection;
use crate::handlers::HandlerResult;
use crate::protocol::ServerEvent;
use crate::server::GatewayState;
use duo_core::{ReactionKind, Snowflake};
use duo_service::MessageStore;
use std::sync::Arc;

/// Handles `add_reaction` and `remove_reaction`
pub struct ReactionHandler;

impl ReactionHandler {
    /// Add a reaction and broadcast the message's new reaction set
    pub async fn handle_add(
        state: &GatewayState,
        connection: &Arc<Connection>,
        message_id: Snowflake,
        kind: ReactionKind,
    ) -> HandlerResult<()> {
        let message = MessageStore::new(state.service_context())
            .add_reaction(message_id, connection.user_id(), kind)
            .await?;

        Self::broadcast_update(state, message_id, message.room_id, message.reactions).await;
        Ok(())
    }

    /// Remove a reaction (idempotent) and broadcast the new reaction set
    pub async fn handle_remove(
        state: &GatewayState,
        connection: &Arc<Connection>,
        message_id: Snowflake,
        kind: ReactionKind,
    ) -> HandlerResult<()> {
        let message = MessageStore::new(state.service_context())
            .remove_reaction(message_id, connection.user_id(), kind)
            .await?;

        Self::broadcast_update(state, message_id, message.room_id, message.reactions).await;
        Ok(())
    }

    async fn broadcast_update(
        state: &GatewayState,
        message_id: Snowflake,
        room_id: Snowflake,
        reactions: Vec<duo_core::Reaction>,
    ) {
        state
            .bridge()
            .broadcast_to_room(
                room_id,
                &ServerEvent::ReactionUpdated {
                    message_id,
                    room_id,
                    reactions,
                },
                None,
            )
            .await;
    }
}
