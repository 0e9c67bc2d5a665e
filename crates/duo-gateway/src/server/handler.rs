//! WebSocket handler
//!
//! Authenticates the handshake, pumps frames both ways, and cleans up
//! when the socket goes away.

use crate::connection::Connection;
use crate::handlers::EventRouter;
use crate::protocol::{ClientEvent, ServerEvent};
use crate::server::GatewayState;
use axum::{
    extract::{ws::Message, Query, State, WebSocketUpgrade},
    response::IntoResponse,
};
use duo_service::SessionDirectory;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Channel buffer size for outgoing events
const EVENT_BUFFER_SIZE: usize = 100;

/// Handshake query parameters
#[derive(Debug, Deserialize)]
pub struct ConnectParams {
    /// Opaque session token; required
    session: Option<String>,
}

/// WebSocket upgrade handler
pub async fn gateway_handler(
    State(state): State<GatewayState>,
    Query(params): Query<ConnectParams>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(state, socket, params))
}

/// Drive an upgraded socket to completion
async fn handle_socket(
    state: GatewayState,
    socket: axum::extract::ws::WebSocket,
    params: ConnectParams,
) {
    let (mut ws_sink, mut ws_stream) = socket.split();

    // Handshake: the session token must arrive with the upgrade
    let Some(session_id) = params.session.filter(|s| !s.trim().is_empty()) else {
        let event = ServerEvent::error(
            "Missing session token",
            Some("SESSION_NOT_FOUND".to_string()),
            None,
        );
        if let Ok(json) = event.to_json() {
            ws_sink.send(Message::Text(json.into())).await.ok();
        }
        ws_sink.close().await.ok();
        return;
    };

    let socket_id = format!("sock-{}", state.service_context().generate_id());

    let session = match SessionDirectory::new(state.service_context())
        .connect(&session_id, &socket_id)
        .await
    {
        Ok(session) => session,
        Err(e) => {
            tracing::warn!(socket_id = %socket_id, error = %e, "Handshake failed");
            let event = ServerEvent::error(
                "Session could not be established",
                Some(e.error_code().to_string()),
                None,
            );
            if let Ok(json) = event.to_json() {
                ws_sink.send(Message::Text(json.into())).await.ok();
            }
            ws_sink.close().await.ok();
            return;
        }
    };

    let (tx, mut rx) = mpsc::channel::<ServerEvent>(EVENT_BUFFER_SIZE);
    let connection = state.connection_manager().add_connection(
        socket_id.clone(),
        session_id.clone(),
        session.user_id,
        tx,
    );

    tracing::info!(
        socket_id = %socket_id,
        user_id = %session.user_id,
        "WebSocket connection established"
    );

    let state_recv = state.clone();
    let connection_recv = connection.clone();

    let recv_task = tokio::spawn(async move {
        while let Some(msg) = ws_stream.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    handle_text_frame(&state_recv, &connection_recv, &text).await;
                }
                Ok(Message::Binary(_)) => {
                    tracing::debug!(
                        socket_id = %connection_recv.socket_id(),
                        "Binary frames not supported"
                    );
                    connection_recv
                        .send(ServerEvent::error(
                            "Binary frames are not supported",
                            Some("VALIDATION_ERROR".to_string()),
                            None,
                        ))
                        .await
                        .ok();
                }
                Ok(Message::Ping(_) | Message::Pong(_)) => {}
                Ok(Message::Close(_)) => {
                    tracing::info!(
                        socket_id = %connection_recv.socket_id(),
                        "Client closed connection"
                    );
                    break;
                }
                Err(e) => {
                    tracing::warn!(
                        socket_id = %connection_recv.socket_id(),
                        error = %e,
                        "WebSocket error"
                    );
                    break;
                }
            }
        }
    });

    let socket_id_send = socket_id.clone();
    let send_task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match event.to_json() {
                Ok(json) => {
                    if ws_sink.send(Message::Text(json.into())).await.is_err() {
                        tracing::debug!(socket_id = %socket_id_send, "Socket send failed");
                        break;
                    }
                }
                Err(e) => {
                    tracing::error!(
                        socket_id = %socket_id_send,
                        error = %e,
                        "Event serialization failed"
                    );
                }
            }
        }

        ws_sink.close().await.ok();
    });

    tokio::select! {
        _ = recv_task => {}
        _ = send_task => {}
    }

    cleanup_connection(&state, &connection).await;
}

/// Parse and dispatch one client frame
///
/// Every failure ends as an `error` event on the socket; the connection
/// itself stays up.
async fn handle_text_frame(state: &GatewayState, connection: &Arc<Connection>, text: &str) {
    let event = match ClientEvent::from_json(text) {
        Ok(event) => event,
        Err(e) => {
            tracing::debug!(
                socket_id = %connection.socket_id(),
                error = %e,
                "Malformed client frame"
            );
            connection
                .send(ServerEvent::error(
                    "Malformed event",
                    Some("VALIDATION_ERROR".to_string()),
                    None,
                ))
                .await
                .ok();
            return;
        }
    };

    let event_name = event.name();
    if let Err(e) = EventRouter::dispatch(state, connection, event).await {
        if e.is_client_recoverable() {
            tracing::debug!(
                socket_id = %connection.socket_id(),
                event = event_name,
                error = %e,
                "Client event rejected"
            );
        } else {
            tracing::error!(
                socket_id = %connection.socket_id(),
                event = event_name,
                error = %e,
                "Handler failed"
            );
        }
        connection.send(e.to_event()).await.ok();
    }
}

/// Tear down a connection's runtime state
///
/// The participant stays on the roster: disconnecting is not leaving.
/// Presence ages out of its set on its own if this cleanup never runs.
async fn cleanup_connection(state: &GatewayState, connection: &Arc<Connection>) {
    let socket_id = connection.socket_id();
    tracing::info!(socket_id = %socket_id, "Cleaning up connection");

    let ctx = state.service_context();

    if let Some(room_id) = connection.room_id().await {
        ctx.session_cache()
            .remove_presence(room_id, connection.user_id())
            .await;

        state
            .connection_manager()
            .leave_room(socket_id, room_id)
            .await;
        if state.connection_manager().room_socket_count(room_id) == 0 {
            if let Some(dispatcher) = state.dispatcher() {
                dispatcher.unsubscribe_room(room_id).await.ok();
            }
        }
    }

    if let Err(e) = SessionDirectory::new(ctx).disconnect(socket_id).await {
        tracing::warn!(socket_id = %socket_id, error = %e, "Session disconnect failed");
    }

    state.rate_limiter().forget(connection.session_id());
    state.connection_manager().remove_connection(socket_id).await;
}
