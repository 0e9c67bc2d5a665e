//! Session lookup, socket binding, and room presence in Redis.
//!
//! The socket <-> session binding is pure runtime state and lives only
//! here; the durable store never sees socket ids. Like the room cache,
//! everything is best-effort.

use crate::pool::RedisPool;
use duo_core::Snowflake;
use serde::{Deserialize, Serialize};

/// Key prefix for session token -> session data
const SESSION_PREFIX: &str = "session:";
/// Key prefix for socket id -> session token
const SOCKET_PREFIX: &str = "socket:";
/// Key prefix for per-room presence sets
const PRESENCE_PREFIX: &str = "presence:";

/// TTL for cached session lookups
const SESSION_TTL: u64 = 86400;
/// TTL for socket bindings; refreshed while the socket lives
const SOCKET_TTL: u64 = 3600;
/// TTL for presence sets; refreshed on activity so stale members age out
const PRESENCE_TTL: u64 = 300;

/// Cached subset of a session, enough to authenticate a connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedSession {
    pub session_id: String,
    pub user_id: Snowflake,
    pub current_room_id: Option<Snowflake>,
}

/// Redis-backed session and presence cache
#[derive(Clone)]
pub struct SessionCache {
    pool: RedisPool,
}

impl SessionCache {
    /// Create a new session cache
    #[must_use]
    pub fn new(pool: RedisPool) -> Self {
        Self { pool }
    }

    fn session_key(session_id: &str) -> String {
        format!("{SESSION_PREFIX}{session_id}")
    }

    fn socket_key(socket_id: &str) -> String {
        format!("{SOCKET_PREFIX}{socket_id}")
    }

    fn presence_key(room_id: Snowflake) -> String {
        format!("{PRESENCE_PREFIX}{room_id}")
    }

    // ------------------------------------------------------------------
    // Session lookup
    // ------------------------------------------------------------------

    /// Look up a cached session; `None` on miss or cache failure
    pub async fn get(&self, session_id: &str) -> Option<CachedSession> {
        match self
            .pool
            .get_value::<CachedSession>(&Self::session_key(session_id))
            .await
        {
            Ok(session) => session,
            Err(e) => {
                tracing::warn!(error = %e, "Session cache read failed");
                None
            }
        }
    }

    /// Store a session lookup entry
    pub async fn put(&self, session: &CachedSession) {
        if let Err(e) = self
            .pool
            .set(
                &Self::session_key(&session.session_id),
                session,
                Some(SESSION_TTL),
            )
            .await
        {
            tracing::warn!(error = %e, "Session cache write failed");
        }
    }

    /// Drop a session lookup entry
    pub async fn invalidate(&self, session_id: &str) {
        if let Err(e) = self.pool.delete(&Self::session_key(session_id)).await {
            tracing::warn!(error = %e, "Session cache invalidation failed");
        }
    }

    // ------------------------------------------------------------------
    // Socket binding
    // ------------------------------------------------------------------

    /// Bind a socket id to a session token
    pub async fn bind_socket(&self, socket_id: &str, session_id: &str) {
        if let Err(e) = self
            .pool
            .set(
                &Self::socket_key(socket_id),
                &session_id.to_string(),
                Some(SOCKET_TTL),
            )
            .await
        {
            tracing::warn!(socket_id, error = %e, "Socket binding write failed");
        }
    }

    /// Resolve a socket id to its session token
    pub async fn resolve_socket(&self, socket_id: &str) -> Option<String> {
        match self
            .pool
            .get_value::<String>(&Self::socket_key(socket_id))
            .await
        {
            Ok(session_id) => session_id,
            Err(e) => {
                tracing::warn!(socket_id, error = %e, "Socket binding read failed");
                None
            }
        }
    }

    /// Drop a socket binding on disconnect
    pub async fn unbind_socket(&self, socket_id: &str) {
        if let Err(e) = self.pool.delete(&Self::socket_key(socket_id)).await {
            tracing::warn!(socket_id, error = %e, "Socket binding removal failed");
        }
    }

    // ------------------------------------------------------------------
    // Room presence
    // ------------------------------------------------------------------

    /// Mark a user present in a room and refresh the set's TTL
    pub async fn add_presence(&self, room_id: Snowflake, user_id: Snowflake) {
        let key = Self::presence_key(room_id);
        if let Err(e) = self.pool.sadd(&key, &[user_id.to_string()]).await {
            tracing::warn!(room_id = %room_id, error = %e, "Presence write failed");
            return;
        }
        if let Err(e) = self.pool.expire(&key, PRESENCE_TTL).await {
            tracing::warn!(room_id = %room_id, error = %e, "Presence TTL refresh failed");
        }
    }

    /// Remove a user from a room's presence set
    pub async fn remove_presence(&self, room_id: Snowflake, user_id: Snowflake) {
        let key = Self::presence_key(room_id);
        if let Err(e) = self.pool.srem(&key, &[user_id.to_string()]).await {
            tracing::warn!(room_id = %room_id, error = %e, "Presence removal failed");
        }
    }

    /// List user ids currently present in a room
    pub async fn room_presence(&self, room_id: Snowflake) -> Vec<Snowflake> {
        match self.pool.smembers(&Self::presence_key(room_id)).await {
            Ok(members) => members
                .iter()
                .filter_map(|m| m.parse::<i64>().ok())
                .map(Snowflake::new)
                .collect(),
            Err(e) => {
                tracing::warn!(room_id = %room_id, error = %e, "Presence read failed");
                Vec::new()
            }
        }
    }

    /// Drop a room's presence set when the room closes
    pub async fn clear_presence(&self, room_id: Snowflake) {
        if let Err(e) = self.pool.delete(&Self::presence_key(room_id)).await {
            tracing::warn!(room_id = %room_id, error = %e, "Presence clear failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_shapes() {
        assert_eq!(SessionCache::session_key("tok-1"), "session:tok-1");
        assert_eq!(SessionCache::socket_key("sock-9"), "socket:sock-9");
        assert_eq!(
            SessionCache::presence_key(Snowflake::new(77)),
            "presence:77"
        );
    }

    #[test]
    fn test_cached_session_round_trip() {
        let cached = CachedSession {
            session_id: "tok-1".to_string(),
            user_id: Snowflake::new(42),
            current_room_id: Some(Snowflake::new(7)),
        };

        let json = serde_json::to_string(&cached).unwrap();
        let parsed: CachedSession = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, cached);
    }
}
