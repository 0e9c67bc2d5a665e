//! Typing indicator handler

use crate::connection::Connection;
use crate::handlers::{HandlerError, HandlerResult};
use crate::protocol::ServerEvent;
use crate::server::GatewayState;
use duo_core::Snowflake;
use duo_service::RoomRegistry;
use std::sync::Arc;

/// Handles `typing`
pub struct TypingHandler;

impl TypingHandler {
    /// Relay a typing indicator to the rest of the room
    ///
    /// No mutation; membership is still re-checked against the durable
    /// roster so a kicked-out socket cannot keep signalling.
    pub async fn handle(
        state: &GatewayState,
        connection: &Arc<Connection>,
        room_id: Snowflake,
        is_typing: bool,
    ) -> HandlerResult<()> {
        if connection.room_id().await != Some(room_id) {
            return Err(HandlerError::NotInRoom);
        }

        let user_id = connection.user_id();
        RoomRegistry::new(state.service_context())
            .authorize_member(room_id, user_id)
            .await?;

        state
            .bridge()
            .broadcast_to_room(
                room_id,
                &ServerEvent::UserTyping {
                    room_id,
                    user_id,
                    is_typing,
                },
                Some(user_id),
            )
            .await;

        Ok(())
    }
}
