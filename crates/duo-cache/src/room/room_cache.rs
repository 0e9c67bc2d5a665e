//! Cache-aside room snapshots in Redis.
//!
//! Rooms are cached under both their id and their code so that joins by
//! code and lookups by id each hit a single key. All methods are
//! best-effort: failures are logged and the caller falls through to the
//! durable store.

use crate::pool::RedisPool;
use duo_core::{Room, RoomCode, Snowflake};

/// Key prefix for room snapshots by id
const ROOM_PREFIX: &str = "room:";
/// Key prefix for code -> room id mapping
const ROOM_CODE_PREFIX: &str = "room_code:";

/// Snapshot TTL; rooms are short-lived so an hour is plenty
const ROOM_TTL: u64 = 3600;

/// Redis-backed room snapshot cache
#[derive(Clone)]
pub struct RoomCache {
    pool: RedisPool,
}

impl RoomCache {
    /// Create a new room cache
    #[must_use]
    pub fn new(pool: RedisPool) -> Self {
        Self { pool }
    }

    fn room_key(id: Snowflake) -> String {
        format!("{ROOM_PREFIX}{id}")
    }

    fn code_key(code: &RoomCode) -> String {
        format!("{ROOM_CODE_PREFIX}{code}")
    }

    /// Look up a room snapshot by id; `None` on miss or cache failure
    pub async fn get(&self, id: Snowflake) -> Option<Room> {
        match self.pool.get_value::<Room>(&Self::room_key(id)).await {
            Ok(room) => room,
            Err(e) => {
                tracing::warn!(room_id = %id, error = %e, "Room cache read failed");
                None
            }
        }
    }

    /// Look up a room snapshot by code; `None` on miss or cache failure
    pub async fn get_by_code(&self, code: &RoomCode) -> Option<Room> {
        let id = match self.pool.get_value::<Snowflake>(&Self::code_key(code)).await {
            Ok(Some(id)) => id,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(code = %code, error = %e, "Room cache read failed");
                return None;
            }
        };

        self.get(id).await
    }

    /// Store a room snapshot under both its id and its code
    pub async fn put(&self, room: &Room) {
        if let Err(e) = self
            .pool
            .set(&Self::room_key(room.id), room, Some(ROOM_TTL))
            .await
        {
            tracing::warn!(room_id = %room.id, error = %e, "Room cache write failed");
            return;
        }

        if let Err(e) = self
            .pool
            .set(&Self::code_key(&room.code), &room.id, Some(ROOM_TTL))
            .await
        {
            tracing::warn!(room_id = %room.id, error = %e, "Room code cache write failed");
        }
    }

    /// Drop a room's snapshot and code mapping
    pub async fn invalidate(&self, id: Snowflake, code: &RoomCode) {
        let room_key = Self::room_key(id);
        let code_key = Self::code_key(code);

        if let Err(e) = self
            .pool
            .delete_many(&[room_key.as_str(), code_key.as_str()])
            .await
        {
            tracing::warn!(room_id = %id, error = %e, "Room cache invalidation failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_shapes() {
        let id = Snowflake::new(12345);
        assert_eq!(RoomCache::room_key(id), "room:12345");

        let code = RoomCode::parse("ABC123").unwrap();
        assert_eq!(RoomCache::code_key(&code), "room_code:ABC123");
    }
}
