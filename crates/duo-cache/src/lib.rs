//! # duo-cache
//!
//! Redis caching layer for rooms, sessions, and pub/sub messaging.
//!
//! ## Features
//!
//! - **Connection Pool**: Managed Redis connection pool with deadpool
//! - **Room Cache**: Cache-aside room snapshots keyed by id and code
//! - **Session Cache**: Session lookup, socket binding, and room presence
//! - **Pub/Sub**: Real-time event distribution across server instances
//!
//! Cache reads and writes are best-effort: a Redis outage degrades to the
//! durable store, it never fails an operation.
//!
//! ## Example
//!
//! ```ignore
//! use duo_cache::{Publisher, PubSubChannel, PubSubEvent, RedisPool, RedisPoolConfig, RoomCache};
//!
//! // Create Redis pool
//! let config = RedisPoolConfig::default();
//! let pool = RedisPool::new(config)?;
//!
//! // Create stores
//! let room_cache = RoomCache::new(pool.clone());
//! let publisher = Publisher::new(pool.clone());
//!
//! // Publish event
//! let event = PubSubEvent::new("new_message", data);
//! publisher.publish(&PubSubChannel::room(room_id), &event).await?;
//! ```

pub mod pool;
pub mod pubsub;
pub mod room;
pub mod session;

// Re-export pool types
pub use pool::{RedisPool, RedisPoolConfig, RedisPoolError, RedisResult, SharedRedisPool};

// Re-export room cache types
pub use room::RoomCache;

// Re-export session cache types
pub use session::{CachedSession, SessionCache};

// Re-export pubsub types
pub use pubsub::{
    PubSubChannel, PubSubEvent, Publisher, ReceivedMessage, Subscriber, SubscriberBuilder,
    SubscriberConfig, SubscriberError, SubscriberResult, BROADCAST_CHANNEL, ROOM_CHANNEL_PREFIX,
    USER_CHANNEL_PREFIX,
};
