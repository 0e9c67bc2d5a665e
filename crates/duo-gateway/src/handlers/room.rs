//! Room join/leave handlers

use crate::connection::Connection;
use crate::handlers::{HandlerError, HandlerResult};
use crate::protocol::ServerEvent;
use crate::server::GatewayState;
use duo_core::{DomainError, Snowflake};
use duo_service::{MessageStore, RoomRegistry, SessionDirectory};
use std::sync::Arc;

/// Messages sent with `room_joined`
const RECENT_HISTORY_LIMIT: i64 = 50;

/// Handles `join_room` and `leave_room`
pub struct RoomHandler;

impl RoomHandler {
    /// Subscribe a socket to a room it participates in
    ///
    /// The caller must already be on the roster (rooms are entered by
    /// code through the room service); an inactive participant is
    /// reactivated here so a returning user lands straight back in.
    pub async fn handle_join(
        state: &GatewayState,
        connection: &Arc<Connection>,
        room_id: Snowflake,
    ) -> HandlerResult<()> {
        let ctx = state.service_context();
        let registry = RoomRegistry::new(ctx);
        let user_id = connection.user_id();

        let room = registry
            .get_room(room_id)
            .await?
            .ok_or(DomainError::RoomNotFound)?;
        let participant = room
            .participant(user_id)
            .ok_or(DomainError::UserNotInRoom)?
            .clone();

        // Reactivation goes through the code-join path so the capacity
        // and closed checks stay in one place
        let room = if participant.is_active {
            registry.authorize_member(room_id, user_id).await?
        } else {
            registry
                .join_room(&room.code, user_id, &participant.display_name)
                .await?
                .room
        };

        connection
            .set_display_name(participant.display_name.clone())
            .await;

        // First local socket for this room pulls in the Redis channel
        let manager = state.connection_manager();
        let newly_subscribed = manager.room_socket_count(room_id) == 0;
        manager.join_room(connection.socket_id(), room_id).await;
        if newly_subscribed {
            if let Some(dispatcher) = state.dispatcher() {
                if let Err(e) = dispatcher.subscribe_room(room_id).await {
                    tracing::warn!(room_id = %room_id, error = %e, "Room channel subscribe failed");
                }
            }
        }

        let directory = SessionDirectory::new(ctx);
        directory
            .set_current_room(connection.session_id(), Some(room_id))
            .await?;
        ctx.session_cache().add_presence(room_id, user_id).await;

        let recent = MessageStore::new(ctx)
            .list_messages(room_id, user_id, None, None, Some(RECENT_HISTORY_LIMIT))
            .await?;

        connection
            .send(ServerEvent::RoomJoined {
                room_id,
                user_id,
                room_code: room.code.as_str().to_string(),
                participants: room.participants.clone(),
                recent_messages: recent.items,
            })
            .await
            .map_err(|e| HandlerError::Internal(e.to_string()))?;

        state
            .bridge()
            .broadcast_to_room(
                room_id,
                &ServerEvent::UserJoined {
                    room_id,
                    user_id,
                    display_name: participant.display_name,
                },
                Some(user_id),
            )
            .await;

        state
            .bridge()
            .broadcast_to_room(
                room_id,
                &ServerEvent::ParticipantsUpdated {
                    room_id,
                    participants: room.participants,
                },
                None,
            )
            .await;

        tracing::info!(
            socket_id = %connection.socket_id(),
            room_id = %room_id,
            user_id = %user_id,
            "Socket joined room"
        );

        Ok(())
    }

    /// Leave a room, closing it when the last active participant goes
    pub async fn handle_leave(
        state: &GatewayState,
        connection: &Arc<Connection>,
        room_id: Snowflake,
    ) -> HandlerResult<()> {
        let ctx = state.service_context();
        let user_id = connection.user_id();

        let outcome = RoomRegistry::new(ctx).leave_room(room_id, user_id).await?;

        let manager = state.connection_manager();
        manager.leave_room(connection.socket_id(), room_id).await;
        if manager.room_socket_count(room_id) == 0 {
            if let Some(dispatcher) = state.dispatcher() {
                if let Err(e) = dispatcher.unsubscribe_room(room_id).await {
                    tracing::warn!(room_id = %room_id, error = %e, "Room channel unsubscribe failed");
                }
            }
        }

        SessionDirectory::new(ctx)
            .set_current_room(connection.session_id(), None)
            .await?;
        ctx.session_cache().remove_presence(room_id, user_id).await;

        // Ack the leaver directly; their socket left the topic already
        connection
            .send(ServerEvent::UserLeft { room_id, user_id })
            .await
            .ok();

        state
            .bridge()
            .broadcast_to_room(room_id, &ServerEvent::UserLeft { room_id, user_id }, None)
            .await;

        state
            .bridge()
            .broadcast_to_room(
                room_id,
                &ServerEvent::ParticipantsUpdated {
                    room_id,
                    participants: outcome.room.participants,
                },
                None,
            )
            .await;

        if outcome.closed {
            state
                .bridge()
                .broadcast_to_room(
                    room_id,
                    &ServerEvent::RoomClosed {
                        room_id,
                        reason: "all participants left".to_string(),
                    },
                    None,
                )
                .await;
        }

        tracing::info!(
            socket_id = %connection.socket_id(),
            room_id = %room_id,
            user_id = %user_id,
            closed = outcome.closed,
            "Socket left room"
        );

        Ok(())
    }
}
