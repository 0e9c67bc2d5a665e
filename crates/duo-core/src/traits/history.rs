//! History recorder port
//!
//! The room layer records chat history without depending on the session
//! layer directly; `SessionDirectory` implements this narrow interface,
//! which breaks what would otherwise be a Room-Session dependency cycle.

use async_trait::async_trait;

use crate::traits::repositories::RepoResult;
use crate::value_objects::Snowflake;

/// Records room membership into per-user chat history
#[async_trait]
pub trait HistoryRecorder: Send + Sync {
    /// Record that a user chatted in a room (idempotent)
    async fn record_chat(&self, user_id: Snowflake, room_id: Snowflake) -> RepoResult<()>;
}
