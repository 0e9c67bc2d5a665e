//! Routes remote room events to local sockets.
//!
//! The dispatcher owns the Redis subscription for this instance. It drops
//! events tagged with its own instance id, since the bridge delivers those
//! straight to local connections at publish time.

use crate::connection::ConnectionManager;
use crate::protocol::ServerEvent;
use duo_cache::{PubSubChannel, ReceivedMessage, Subscriber, SubscriberBuilder, SubscriberError};
use duo_core::Snowflake;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;

#[derive(Debug, Clone)]
pub struct EventDispatcherConfig {
    pub redis_url: String,
    pub broadcast_buffer: usize,
    pub reconnect_delay_ms: u64,
}

impl Default for EventDispatcherConfig {
    fn default() -> Self {
        Self {
            redis_url: "redis://127.0.0.1:6379".to_string(),
            broadcast_buffer: 1024,
            reconnect_delay_ms: 1000,
        }
    }
}

pub struct EventDispatcher {
    connection_manager: Arc<ConnectionManager>,
    subscriber: Subscriber,
    instance_id: String,
    running: AtomicBool,
}

impl EventDispatcher {
    pub async fn new(
        config: EventDispatcherConfig,
        connection_manager: Arc<ConnectionManager>,
        instance_id: String,
    ) -> Result<Self, SubscriberError> {
        let subscriber = SubscriberBuilder::new()
            .redis_url(&config.redis_url)
            .broadcast_buffer(config.broadcast_buffer)
            .reconnect_delay_ms(config.reconnect_delay_ms)
            .build()
            .await?;

        Ok(Self {
            connection_manager,
            subscriber,
            instance_id,
            running: AtomicBool::new(false),
        })
    }

    /// Start listening for this room's remote events.
    pub async fn subscribe_room(&self, room_id: Snowflake) -> Result<(), SubscriberError> {
        self.subscriber
            .subscribe(&[PubSubChannel::room(room_id)])
            .await
    }

    pub async fn unsubscribe_room(&self, room_id: Snowflake) -> Result<(), SubscriberError> {
        self.subscriber
            .unsubscribe(&[PubSubChannel::room(room_id)])
            .await
    }

    /// Spawn the dispatch loop. Idempotent; a second call is a no-op.
    pub fn start(self: Arc<Self>) {
        if self.running.swap(true, Ordering::SeqCst) {
            tracing::warn!("Event dispatcher is already running");
            return;
        }

        tokio::spawn(async move {
            self.dispatch_loop().await;
        });
        tracing::info!("Event dispatcher started");
    }

    pub async fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.subscriber.shutdown().await.ok();
        tracing::info!("Event dispatcher stopped");
    }

    async fn dispatch_loop(&self) {
        let mut receiver = self.subscriber.receiver();

        while self.running.load(Ordering::SeqCst) {
            match receiver.recv().await {
                Ok(msg) => self.dispatch(msg).await,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(lagged = n, "Event dispatcher lagged behind");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::warn!("Event dispatcher channel closed");
                    break;
                }
            }
        }

        self.running.store(false, Ordering::SeqCst);
        tracing::info!("Event dispatcher loop ended");
    }

    async fn dispatch(&self, msg: ReceivedMessage) {
        let Some(room_id) = self.routable_room(&msg) else {
            return;
        };
        // msg.event is Some, checked by routable_room
        let Some(event) = msg.event else { return };

        let server_event: ServerEvent = match serde_json::from_value(event.data) {
            Ok(e) => e,
            Err(e) => {
                tracing::warn!(
                    room_id = %room_id,
                    event_type = %event.event_type,
                    error = %e,
                    "Malformed room event, dropping"
                );
                return;
            }
        };

        let sent = self
            .connection_manager
            .send_to_room(room_id, server_event, None)
            .await;

        tracing::trace!(
            room_id = %room_id,
            event_type = %event.event_type,
            sent,
            "Remote event dispatched to room"
        );
    }

    /// The room to deliver to, or `None` when the message should be
    /// dropped (not an event, our own echo, or not a room channel).
    fn routable_room(&self, msg: &ReceivedMessage) -> Option<Snowflake> {
        let event = msg.event.as_ref()?;
        if event.origin.as_deref() == Some(self.instance_id.as_str()) {
            return None;
        }
        match msg.channel {
            PubSubChannel::Room(room_id) => Some(room_id),
            _ => {
                tracing::debug!(channel = ?msg.channel, "Event on non-room channel, ignoring");
                None
            }
        }
    }
}

impl Drop for EventDispatcher {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use duo_cache::PubSubEvent;

    fn msg(channel: &str, event: Option<PubSubEvent>) -> ReceivedMessage {
        ReceivedMessage {
            channel: PubSubChannel::parse(channel),
            event,
            payload: String::new(),
        }
    }

    fn dispatcher_parts() -> (Arc<ConnectionManager>, String) {
        (ConnectionManager::new_shared(), "gw-1".to_string())
    }

    #[tokio::test]
    async fn own_events_are_not_routed() {
        let (manager, instance_id) = dispatcher_parts();
        let dispatcher = EventDispatcher {
            connection_manager: manager,
            subscriber: Subscriber::new(duo_cache::SubscriberConfig::default()),
            instance_id,
            running: AtomicBool::new(false),
        };

        let own = msg(
            "room:42",
            Some(PubSubEvent::new("new_message", serde_json::json!({})).with_origin("gw-1")),
        );
        assert_eq!(dispatcher.routable_room(&own), None);

        let remote = msg(
            "room:42",
            Some(PubSubEvent::new("new_message", serde_json::json!({})).with_origin("gw-2")),
        );
        assert_eq!(
            dispatcher.routable_room(&remote),
            Some(Snowflake::new(42))
        );
    }

    #[tokio::test]
    async fn non_room_channels_are_ignored() {
        let (manager, instance_id) = dispatcher_parts();
        let dispatcher = EventDispatcher {
            connection_manager: manager,
            subscriber: Subscriber::new(duo_cache::SubscriberConfig::default()),
            instance_id,
            running: AtomicBool::new(false),
        };

        let broadcast = msg(
            "broadcast",
            Some(PubSubEvent::new("notice", serde_json::json!({})).with_origin("gw-2")),
        );
        assert_eq!(dispatcher.routable_room(&broadcast), None);

        let raw = msg("room:42", None);
        assert_eq!(dispatcher.routable_room(&raw), None);
    }
}
