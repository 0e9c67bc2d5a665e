//! Redis pub/sub publisher.

use crate::pool::{RedisPool, RedisResult};
use crate::pubsub::PubSubChannel;
use duo_core::Snowflake;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};

/// Envelope carried on every pub/sub channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PubSubEvent {
    /// Event name, e.g. "new_message" or "user_typing".
    pub event_type: String,
    pub data: serde_json::Value,
    /// Publishing instance; receivers drop their own events since the
    /// bridge already delivered those locally.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
}

impl PubSubEvent {
    #[must_use]
    pub fn new(event_type: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            event_type: event_type.into(),
            data,
            origin: None,
        }
    }

    #[must_use]
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[derive(Clone)]
pub struct Publisher {
    pool: RedisPool,
}

impl Publisher {
    #[must_use]
    pub fn new(pool: RedisPool) -> Self {
        Self { pool }
    }

    /// Publish an event; returns how many subscribers received it.
    pub async fn publish(&self, channel: &PubSubChannel, event: &PubSubEvent) -> RedisResult<u32> {
        let payload = event.to_json()?;
        let channel_name = channel.name();

        let mut conn = self.pool.get().await?;
        let receivers: u32 = conn.publish(&channel_name, &payload).await?;

        tracing::debug!(
            channel = %channel_name,
            event_type = %event.event_type,
            receivers,
            "Published event"
        );
        Ok(receivers)
    }

    /// Publish to a room's channel.
    pub async fn publish_to_room(
        &self,
        room_id: Snowflake,
        event: &PubSubEvent,
    ) -> RedisResult<u32> {
        self.publish(&PubSubChannel::room(room_id), event).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_event_has_no_origin() {
        let data = serde_json::json!({ "id": "12345", "content": "Hello!" });
        let event = PubSubEvent::new("new_message", data.clone());

        assert_eq!(event.event_type, "new_message");
        assert_eq!(event.data, data);
        assert!(event.origin.is_none());
    }

    #[test]
    fn origin_tag_is_carried() {
        let event =
            PubSubEvent::new("new_message", serde_json::json!({})).with_origin("instance-1");
        assert_eq!(event.origin.as_deref(), Some("instance-1"));
    }

    #[test]
    fn json_omits_unset_origin() {
        let event = PubSubEvent::new("user_typing", serde_json::json!({"content": "test"}));
        let json = event.to_json().unwrap();

        assert!(json.contains("user_typing"));
        assert!(!json.contains("origin"));
    }
}
