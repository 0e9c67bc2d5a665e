//! Session directory service
//!
//! Resolves client-supplied opaque tokens to sessions, minting a user id
//! on first contact with first-writer-wins semantics. Also owns the
//! socket binding, presence, and the per-session chat history.

use std::sync::Arc;

use async_trait::async_trait;
use duo_cache::CachedSession;
use duo_core::{DomainError, HistoryRecorder, RepoResult, Session, SessionRepository, Snowflake};
use tracing::{debug, info, instrument};

use super::context::ServiceContext;
use super::error::{ServiceError, ServiceResult};

/// Longest token accepted from a client
const MAX_TOKEN_LEN: usize = 128;

/// Session directory service
pub struct SessionDirectory<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> SessionDirectory<'a> {
    /// Create a new SessionDirectory
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Resolve a token to its session, minting one on first contact
    ///
    /// Known tokens come out of the cache; a miss or a cache failure
    /// falls through to the durable row. A cache hit carries only the
    /// identity subset, so history operations re-read the repository.
    ///
    /// Two clients racing on the same fresh token both end up with the
    /// same user id: the insert is conditional, and the loser re-reads
    /// the winner's row.
    #[instrument(skip(self))]
    pub async fn resolve(&self, session_id: &str) -> ServiceResult<Session> {
        validate_token(session_id)?;

        if let Some(cached) = self.ctx.session_cache().get(session_id).await {
            debug!(user_id = %cached.user_id, "Session resolved from cache");
            return Ok(hydrate(cached));
        }

        if let Some(session) = self.ctx.session_repo().find(session_id).await? {
            self.cache_put(&session).await;
            return Ok(session);
        }

        let minted = Session::new(session_id.to_string(), self.ctx.generate_id());
        if self.ctx.session_repo().insert_if_absent(&minted).await? {
            info!(user_id = %minted.user_id, "Session minted");
            self.cache_put(&minted).await;
            return Ok(minted);
        }

        // Lost the race; the winner's user id is the one that counts
        debug!("Session mint raced, re-reading winner");
        self.ctx
            .session_repo()
            .find(session_id)
            .await?
            .ok_or_else(|| ServiceError::internal("session vanished after losing insert race"))
    }

    /// Bind a socket to the session and mark it online
    #[instrument(skip(self))]
    pub async fn connect(&self, session_id: &str, socket_id: &str) -> ServiceResult<Session> {
        let mut session = self.resolve(session_id).await?;

        self.ctx.session_repo().set_online(session_id, true).await?;
        self.ctx
            .session_cache()
            .bind_socket(socket_id, session_id)
            .await;

        session.connect(socket_id.to_string());
        self.cache_put(&session).await;

        info!(user_id = %session.user_id, socket_id, "Session connected");
        Ok(session)
    }

    /// Drop the socket binding and mark the session offline
    ///
    /// Does not leave the current room; presence ages out and the user
    /// can rejoin through their participant record.
    #[instrument(skip(self))]
    pub async fn disconnect(&self, socket_id: &str) -> ServiceResult<Option<Session>> {
        let Some(session_id) = self.ctx.session_cache().resolve_socket(socket_id).await else {
            debug!(socket_id, "Disconnect for unknown socket");
            return Ok(None);
        };

        self.ctx.session_cache().unbind_socket(socket_id).await;
        self.ctx
            .session_repo()
            .set_online(&session_id, false)
            .await?;

        let session = self.ctx.session_repo().find(&session_id).await?;
        if let Some(ref session) = session {
            self.cache_put(session).await;
            info!(user_id = %session.user_id, socket_id, "Session disconnected");
        }
        Ok(session)
    }

    /// Record which room the session is currently in, or clear it
    #[instrument(skip(self))]
    pub async fn set_current_room(
        &self,
        session_id: &str,
        room_id: Option<Snowflake>,
    ) -> ServiceResult<()> {
        self.ctx
            .session_repo()
            .set_current_room(session_id, room_id)
            .await?;
        self.ctx.session_cache().invalidate(session_id).await;
        Ok(())
    }

    /// Archive a room in the session's chat history
    ///
    /// Only rooms the session has actually chatted in can be archived.
    #[instrument(skip(self))]
    pub async fn archive_chat(&self, session_id: &str, room_id: Snowflake) -> ServiceResult<()> {
        let session = self.require(session_id).await?;
        if !session.chat_history.contains(&room_id) {
            return Err(DomainError::ValidationError(
                "room is not in this session's chat history".to_string(),
            )
            .into());
        }

        self.ctx
            .session_repo()
            .set_archived(session_id, room_id, true)
            .await?;
        Ok(())
    }

    /// Unarchive a room (idempotent)
    #[instrument(skip(self))]
    pub async fn unarchive_chat(&self, session_id: &str, room_id: Snowflake) -> ServiceResult<()> {
        self.require(session_id).await?;
        self.ctx
            .session_repo()
            .set_archived(session_id, room_id, false)
            .await?;
        Ok(())
    }

    /// Remove a room from history and the archive (idempotent)
    #[instrument(skip(self))]
    pub async fn remove_history(&self, session_id: &str, room_id: Snowflake) -> ServiceResult<()> {
        self.require(session_id).await?;
        self.ctx
            .session_repo()
            .remove_history(session_id, room_id)
            .await?;
        Ok(())
    }

    async fn require(&self, session_id: &str) -> ServiceResult<Session> {
        validate_token(session_id)?;
        self.ctx
            .session_repo()
            .find(session_id)
            .await?
            .ok_or_else(|| DomainError::SessionNotFound(session_id.to_string()).into())
    }

    async fn cache_put(&self, session: &Session) {
        self.ctx
            .session_cache()
            .put(&CachedSession {
                session_id: session.session_id.clone(),
                user_id: session.user_id,
                current_room_id: session.current_room_id,
            })
            .await;
    }
}

/// Rebuild a session from its cached identity subset
///
/// History and timestamps are not cached; callers that need them go
/// through the repository.
fn hydrate(cached: CachedSession) -> Session {
    let mut session = Session::new(cached.session_id, cached.user_id);
    session.current_room_id = cached.current_room_id;
    session
}

fn validate_token(session_id: &str) -> ServiceResult<()> {
    if session_id.trim().is_empty() {
        return Err(ServiceError::validation("session token must not be empty"));
    }
    if session_id.len() > MAX_TOKEN_LEN {
        return Err(ServiceError::validation(format!(
            "session token exceeds {MAX_TOKEN_LEN} bytes"
        )));
    }
    Ok(())
}

/// [`HistoryRecorder`] backed by the session repository
///
/// Lets the room side record chat history without depending on the
/// session service directly.
pub struct SessionHistoryRecorder {
    session_repo: Arc<dyn SessionRepository>,
}

impl SessionHistoryRecorder {
    pub fn new(session_repo: Arc<dyn SessionRepository>) -> Self {
        Self { session_repo }
    }
}

#[async_trait]
impl HistoryRecorder for SessionHistoryRecorder {
    async fn record_chat(&self, user_id: Snowflake, room_id: Snowflake) -> RepoResult<()> {
        self.session_repo.add_history(user_id, room_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_validation() {
        assert!(validate_token("tok-1").is_ok());
        assert!(validate_token("").is_err());
        assert!(validate_token("   ").is_err());
        assert!(validate_token(&"x".repeat(MAX_TOKEN_LEN + 1)).is_err());
    }

    #[test]
    fn test_hydrated_session_keeps_the_cached_identity() {
        let cached = CachedSession {
            session_id: "tok-1".to_string(),
            user_id: Snowflake::new(42),
            current_room_id: Some(Snowflake::new(7)),
        };

        let session = hydrate(cached);
        assert_eq!(session.session_id, "tok-1");
        assert_eq!(session.user_id, Snowflake::new(42));
        assert_eq!(session.current_room_id, Some(Snowflake::new(7)));
        assert!(session.chat_history.is_empty());
    }

    #[test]
    fn test_history_recorder_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SessionHistoryRecorder>();
    }
}
