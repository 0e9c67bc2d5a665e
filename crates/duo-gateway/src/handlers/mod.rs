//! Client event handlers
//!
//! Every event runs the same pipeline: rate-limit admission, membership
//! validation against the durable store, mutation, broadcast. Handler
//! errors become a single `error` event on the offending socket; they
//! never close the connection.

mod error;
mod message;
mod reaction;
mod room;
mod typing;

pub use error::{HandlerError, HandlerResult};
pub use message::MessageHandler;
pub use reaction::ReactionHandler;
pub use room::RoomHandler;
pub use typing::TypingHandler;

use crate::connection::Connection;
use crate::protocol::ClientEvent;
use crate::server::GatewayState;
use std::sync::Arc;

/// Dispatch incoming client events to their handlers
pub struct EventRouter;

impl EventRouter {
    /// Handle one client event end to end
    pub async fn dispatch(
        state: &GatewayState,
        connection: &Arc<Connection>,
        event: ClientEvent,
    ) -> HandlerResult<()> {
        state
            .rate_limiter()
            .check(connection.session_id(), event.name())?;

        tracing::trace!(
            socket_id = %connection.socket_id(),
            event = event.name(),
            "Dispatching client event"
        );

        match event {
            ClientEvent::JoinRoom { room_id } => {
                RoomHandler::handle_join(state, connection, room_id).await
            }
            ClientEvent::LeaveRoom { room_id } => {
                RoomHandler::handle_leave(state, connection, room_id).await
            }
            ClientEvent::SendMessage {
                room_id,
                content,
                content_type,
            } => MessageHandler::handle_send(state, connection, room_id, &content, content_type)
                .await,
            ClientEvent::Typing { room_id, is_typing } => {
                TypingHandler::handle(state, connection, room_id, is_typing).await
            }
            ClientEvent::AddReaction { message_id, kind } => {
                ReactionHandler::handle_add(state, connection, message_id, kind).await
            }
            ClientEvent::RemoveReaction { message_id, kind } => {
                ReactionHandler::handle_remove(state, connection, message_id, kind).await
            }
            ClientEvent::DeleteMessage { message_id } => {
                MessageHandler::handle_delete(state, connection, message_id).await
            }
        }
    }
}
