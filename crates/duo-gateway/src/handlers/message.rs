//! Message send/delete handlers

use crate::connection::Connection;
use crate::handlers::{HandlerError, HandlerResult};
use crate::protocol::ServerEvent;
use crate::server::GatewayState;
use duo_core::{ContentType, Snowflake};
use duo_service::MessageStore;
use std::sync::Arc;

/// Handles `send_message` and `delete_message`
pub struct MessageHandler;

impl MessageHandler {
    /// Append a message and broadcast it to the room
    pub async fn handle_send(
        state: &GatewayState,
        connection: &Arc<Connection>,
        room_id: Snowflake,
        content: &str,
        content_type: ContentType,
    ) -> HandlerResult<()> {
        if connection.room_id().await != Some(room_id) {
            return Err(HandlerError::NotInRoom);
        }

        let ctx = state.service_context();
        let user_id = connection.user_id();

        let message = MessageStore::new(ctx)
            .send_message(room_id, user_id, content, content_type)
            .await?;

        // Activity keeps the presence set alive
        ctx.session_cache().add_presence(room_id, user_id).await;

        state
            .bridge()
            .broadcast_to_room(room_id, &ServerEvent::NewMessage { message }, None)
            .await;

        Ok(())
    }

    /// Soft-delete a message and broadcast the tombstone
    pub async fn handle_delete(
        state: &GatewayState,
        connection: &Arc<Connection>,
        message_id: Snowflake,
    ) -> HandlerResult<()> {
        let ctx = state.service_context();
        let user_id = connection.user_id();

        let message = MessageStore::new(ctx)
            .delete_message(message_id, user_id)
            .await?;

        let deleted_by_name = message.deleted_by_name.clone().unwrap_or_default();
        state
            .bridge()
            .broadcast_to_room(
                message.room_id,
                &ServerEvent::MessageDeleted {
                    message_id,
                    room_id: message.room_id,
                    deleted_by: message.deleted_by.unwrap_or(user_id),
                    placeholder: format!("Message deleted by {deleted_by_name}"),
                },
                None,
            )
            .await;

        Ok(())
    }
}
