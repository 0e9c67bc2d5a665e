//! Redis pub/sub subscriber.
//!
//! A background task owns the Redis connection and pushes everything it
//! hears onto a broadcast channel; callers attach receivers and steer the
//! subscription set through a small control channel. When the connection
//! drops, the task reconnects after a delay and restores every channel it
//! was listening to.

use crate::pubsub::{PubSubChannel, PubSubEvent};
use futures_util::StreamExt;
use redis::Client;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, RwLock};

#[derive(Debug, thiserror::Error)]
pub enum SubscriberError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Channel closed")]
    ChannelClosed,
}

pub type SubscriberResult<T> = Result<T, SubscriberError>;

/// A message pulled off a Redis channel.
#[derive(Debug, Clone)]
pub struct ReceivedMessage {
    pub channel: PubSubChannel,
    /// Decoded event, when the payload was valid JSON.
    pub event: Option<PubSubEvent>,
    pub payload: String,
}

impl ReceivedMessage {
    fn decode(channel_name: &str, payload: String) -> Self {
        Self {
            channel: PubSubChannel::parse(channel_name),
            event: serde_json::from_str(&payload).ok(),
            payload,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SubscriberConfig {
    pub redis_url: String,
    /// Capacity of the fan-out broadcast channel.
    pub broadcast_buffer: usize,
    pub reconnect_delay_ms: u64,
}

impl Default for SubscriberConfig {
    fn default() -> Self {
        Self {
            redis_url: "redis://127.0.0.1:6379".to_string(),
            broadcast_buffer: 1024,
            reconnect_delay_ms: 1000,
        }
    }
}

/// Steering commands for the listener task.
#[derive(Debug)]
enum Control {
    Add(Vec<String>),
    Remove(Vec<String>),
    Stop,
}

/// Handle to the background listener.
pub struct Subscriber {
    events_tx: broadcast::Sender<ReceivedMessage>,
    control_tx: mpsc::Sender<Control>,
}

impl Subscriber {
    /// Spawn the listener task and return a handle to it.
    pub fn new(config: SubscriberConfig) -> Self {
        let (events_tx, _) = broadcast::channel(config.broadcast_buffer);
        let (control_tx, control_rx) = mpsc::channel(32);

        let task = ListenerTask {
            config,
            active: Arc::new(RwLock::new(HashSet::new())),
            events_tx: events_tx.clone(),
            control_rx,
        };
        tokio::spawn(task.run());

        Self {
            events_tx,
            control_tx,
        }
    }

    pub async fn subscribe(&self, channels: &[PubSubChannel]) -> SubscriberResult<()> {
        self.send(Control::Add(Self::names(channels))).await
    }

    pub async fn unsubscribe(&self, channels: &[PubSubChannel]) -> SubscriberResult<()> {
        self.send(Control::Remove(Self::names(channels))).await
    }

    /// Attach a new receiver to the message fan-out.
    #[must_use]
    pub fn receiver(&self) -> broadcast::Receiver<ReceivedMessage> {
        self.events_tx.subscribe()
    }

    pub async fn shutdown(&self) -> SubscriberResult<()> {
        self.send(Control::Stop).await
    }

    fn names(channels: &[PubSubChannel]) -> Vec<String> {
        channels.iter().map(PubSubChannel::name).collect()
    }

    async fn send(&self, cmd: Control) -> SubscriberResult<()> {
        self.control_tx
            .send(cmd)
            .await
            .map_err(|_| SubscriberError::ChannelClosed)
    }
}

/// The background half of [`Subscriber`].
struct ListenerTask {
    config: SubscriberConfig,
    /// Channels to restore after a reconnect.
    active: Arc<RwLock<HashSet<String>>>,
    events_tx: broadcast::Sender<ReceivedMessage>,
    control_rx: mpsc::Receiver<Control>,
}

impl ListenerTask {
    async fn run(mut self) {
        loop {
            match self.connected_session().await {
                Ok(Session::Stopped) => {
                    tracing::info!("Subscriber shutting down");
                    return;
                }
                Ok(Session::StreamEnded) => {
                    tracing::warn!("Pub/sub stream ended, reconnecting");
                }
                Err(e) => {
                    tracing::error!(error = %e, "Subscriber error, reconnecting...");
                }
            }
            tokio::time::sleep(std::time::Duration::from_millis(
                self.config.reconnect_delay_ms,
            ))
            .await;
        }
    }

    /// Drive one Redis connection until it drops or we are told to stop.
    async fn connected_session(&mut self) -> SubscriberResult<Session> {
        let client = Client::open(self.config.redis_url.as_str())?;
        let mut pubsub = client.get_async_pubsub().await?;

        for channel in self.active.read().await.iter() {
            pubsub.subscribe(channel).await?;
        }
        tracing::info!("Subscriber connected to Redis");

        let mut stream = pubsub.on_message();
        loop {
            tokio::select! {
                msg = stream.next() => {
                    let Some(msg) = msg else {
                        return Ok(Session::StreamEnded);
                    };
                    let received = ReceivedMessage::decode(
                        msg.get_channel_name(),
                        msg.get_payload().unwrap_or_default(),
                    );
                    tracing::trace!(channel = ?received.channel, "Received pub/sub message");
                    // No receivers attached is fine.
                    let _ = self.events_tx.send(received);
                }

                cmd = self.control_rx.recv() => {
                    let Some(cmd) = cmd else {
                        tracing::warn!("Control channel closed");
                        return Ok(Session::Stopped);
                    };
                    if matches!(cmd, Control::Stop) {
                        return Ok(Session::Stopped);
                    }
                    // The message stream borrows the connection, so it has
                    // to be dropped before we can touch subscriptions.
                    drop(stream);
                    self.apply(&mut pubsub, cmd).await;
                    stream = pubsub.on_message();
                }
            }
        }
    }

    async fn apply(&self, pubsub: &mut redis::aio::PubSub, cmd: Control) {
        match cmd {
            Control::Add(channels) => {
                for channel in channels {
                    match pubsub.subscribe(&channel).await {
                        Ok(()) => {
                            tracing::debug!(channel = %channel, "Subscribed to channel");
                            self.active.write().await.insert(channel);
                        }
                        Err(e) => {
                            tracing::error!(channel = %channel, error = %e, "Failed to subscribe");
                        }
                    }
                }
            }
            Control::Remove(channels) => {
                for channel in channels {
                    match pubsub.unsubscribe(&channel).await {
                        Ok(()) => {
                            tracing::debug!(channel = %channel, "Unsubscribed from channel");
                            self.active.write().await.remove(&channel);
                        }
                        Err(e) => {
                            tracing::error!(channel = %channel, error = %e, "Failed to unsubscribe");
                        }
                    }
                }
            }
            Control::Stop => {}
        }
    }
}

/// Why a connected session ended.
enum Session {
    Stopped,
    StreamEnded,
}

pub struct SubscriberBuilder {
    config: SubscriberConfig,
    initial_channels: Vec<PubSubChannel>,
}

impl SubscriberBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: SubscriberConfig::default(),
            initial_channels: Vec::new(),
        }
    }

    #[must_use]
    pub fn redis_url(mut self, url: impl Into<String>) -> Self {
        self.config.redis_url = url.into();
        self
    }

    #[must_use]
    pub fn broadcast_buffer(mut self, size: usize) -> Self {
        self.config.broadcast_buffer = size;
        self
    }

    #[must_use]
    pub fn reconnect_delay_ms(mut self, delay: u64) -> Self {
        self.config.reconnect_delay_ms = delay;
        self
    }

    /// Subscribe to a channel as soon as the listener starts.
    #[must_use]
    pub fn subscribe(mut self, channel: PubSubChannel) -> Self {
        self.initial_channels.push(channel);
        self
    }

    pub async fn build(self) -> SubscriberResult<Subscriber> {
        let subscriber = Subscriber::new(self.config);
        if !self.initial_channels.is_empty() {
            subscriber.subscribe(&self.initial_channels).await?;
        }
        Ok(subscriber)
    }
}

impl Default for SubscriberBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_room_channel_and_event() {
        let payload = r#"{"event_type":"new_message","data":{}}"#;
        let msg = ReceivedMessage::decode("room:12345", payload.to_string());

        assert_eq!(
            msg.channel,
            PubSubChannel::Room(duo_core::Snowflake::new(12345))
        );
        assert!(msg.event.is_some());
        assert_eq!(msg.payload, payload);
    }

    #[test]
    fn keeps_raw_payload_when_json_is_invalid() {
        let msg = ReceivedMessage::decode("user:123", "not json".to_string());

        assert_eq!(
            msg.channel,
            PubSubChannel::User(duo_core::Snowflake::new(123))
        );
        assert!(msg.event.is_none());
        assert_eq!(msg.payload, "not json");
    }

    #[test]
    fn builder_collects_settings() {
        let builder = SubscriberBuilder::new()
            .redis_url("redis://localhost:6380")
            .broadcast_buffer(2048)
            .reconnect_delay_ms(500)
            .subscribe(PubSubChannel::broadcast());

        assert_eq!(builder.config.redis_url, "redis://localhost:6380");
        assert_eq!(builder.config.broadcast_buffer, 2048);
        assert_eq!(builder.config.reconnect_delay_ms, 500);
        assert_eq!(builder.initial_channels.len(), 1);
    }
}
