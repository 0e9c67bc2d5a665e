//! Pub/Sub bridge
//!
//! Fans a room event out to local sockets directly and to other
//! instances through Redis. Events are tagged with this instance's id so
//! the dispatcher can skip the copy Redis echoes back.
//!
//! If Redis is unavailable the bridge runs in explicit local-only mode:
//! broadcasts still reach every socket on this instance, and the mode is
//! observable so operators can see the degradation.

use crate::connection::ConnectionManager;
use crate::protocol::ServerEvent;
use duo_cache::{PubSubEvent, Publisher};
use duo_core::Snowflake;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

/// Consecutive publish failures before delivery degrades to local-only
const PUBLISH_FAILURE_LIMIT: u32 = 5;

/// How broadcasts leave this instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryMode {
    /// Local sockets plus Redis pub/sub to other instances
    Redis,
    /// Local sockets only; Redis is unreachable
    LocalOnly,
}

/// Bridge between handlers and the room broadcast topics
pub struct PubSubBridge {
    connection_manager: Arc<ConnectionManager>,
    publisher: Publisher,
    /// Identifies this process in published events
    instance_id: String,
    local_only: AtomicBool,
    /// Consecutive publish failures; reset on the first success
    publish_failures: AtomicU32,
}

impl PubSubBridge {
    pub fn new(
        connection_manager: Arc<ConnectionManager>,
        publisher: Publisher,
        instance_id: String,
        mode: DeliveryMode,
    ) -> Arc<Self> {
        Arc::new(Self {
            connection_manager,
            publisher,
            instance_id,
            local_only: AtomicBool::new(mode == DeliveryMode::LocalOnly),
            publish_failures: AtomicU32::new(0),
        })
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    pub fn delivery_mode(&self) -> DeliveryMode {
        if self.local_only.load(Ordering::Relaxed) {
            DeliveryMode::LocalOnly
        } else {
            DeliveryMode::Redis
        }
    }

    /// Drop to local-only delivery
    fn enter_local_only(&self) {
        if !self.local_only.swap(true, Ordering::Relaxed) {
            tracing::warn!("Pub/sub bridge degraded to local-only delivery");
        }
    }

    /// Broadcast an event to everyone in a room
    ///
    /// The sender's socket lives on this instance, so `exclude_user` only
    /// needs to apply to local delivery; remote instances deliver to all
    /// of their sockets.
    pub async fn broadcast_to_room(
        &self,
        room_id: Snowflake,
        event: &ServerEvent,
        exclude_user: Option<Snowflake>,
    ) -> usize {
        let sent = self
            .connection_manager
            .send_to_room(room_id, event.clone(), exclude_user)
            .await;

        if self.delivery_mode() == DeliveryMode::Redis {
            self.publish(room_id, event).await;
        }

        sent
    }

    async fn publish(&self, room_id: Snowflake, event: &ServerEvent) {
        let data = match serde_json::to_value(event) {
            Ok(data) => data,
            Err(e) => {
                tracing::error!(error = %e, event = event.name(), "Event serialization failed");
                return;
            }
        };

        let envelope = PubSubEvent::new(event.name(), data).with_origin(&self.instance_id);
        match self.publisher.publish_to_room(room_id, &envelope).await {
            Ok(_) => {
                self.publish_failures.store(0, Ordering::Relaxed);
            }
            Err(e) => {
                // Local delivery already happened; cross-instance copy is lost
                tracing::warn!(
                    room_id = %room_id,
                    event = event.name(),
                    error = %e,
                    "Pub/sub publish failed"
                );

                let failures = self.publish_failures.fetch_add(1, Ordering::Relaxed) + 1;
                if failures >= PUBLISH_FAILURE_LIMIT {
                    self.enter_local_only();
                }
            }
        }
    }
}

impl std::fmt::Debug for PubSubBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PubSubBridge")
            .field("instance_id", &self.instance_id)
            .field("mode", &self.delivery_mode())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use duo_cache::{RedisPool, RedisPoolConfig};

    fn unreachable_bridge() -> Arc<PubSubBridge> {
        // Nothing listens on port 1, so every publish attempt fails
        let pool = RedisPool::new(RedisPoolConfig {
            url: "redis://127.0.0.1:1".to_string(),
            ..RedisPoolConfig::default()
        })
        .unwrap();

        PubSubBridge::new(
            ConnectionManager::new_shared(),
            Publisher::new(pool),
            "gw-1".to_string(),
            DeliveryMode::Redis,
        )
    }

    #[tokio::test]
    async fn test_repeated_publish_failures_drop_to_local_only() {
        let bridge = unreachable_bridge();
        let room = Snowflake::new(7);
        let event = ServerEvent::RoomClosed {
            room_id: room,
            reason: "all participants left".to_string(),
        };

        for _ in 0..PUBLISH_FAILURE_LIMIT {
            assert_eq!(bridge.delivery_mode(), DeliveryMode::Redis);
            bridge.broadcast_to_room(room, &event, None).await;
        }

        // Local delivery keeps working; only the Redis leg is gone
        assert_eq!(bridge.delivery_mode(), DeliveryMode::LocalOnly);
        bridge.broadcast_to_room(room, &event, None).await;
        assert_eq!(bridge.delivery_mode(), DeliveryMode::LocalOnly);
    }
}
