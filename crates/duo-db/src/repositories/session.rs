//! PostgreSQL implementation of SessionRepository

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::instrument;

use duo_core::{RepoResult, Session, SessionRepository, Snowflake};

use crate::models::{HistoryModel, SessionModel};

use super::error::map_db_error;

/// PostgreSQL implementation of SessionRepository
#[derive(Clone)]
pub struct PgSessionRepository {
    pool: PgPool,
}

impl PgSessionRepository {
    /// Create a new PgSessionRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn load_history(&self, session_id: &str) -> RepoResult<Vec<HistoryModel>> {
        sqlx::query_as::<_, HistoryModel>(
            r#"
            SELECT room_id, archived
            FROM session_history
            WHERE session_id = $1
            "#,
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)
    }
}

#[async_trait]
impl SessionRepository for PgSessionRepository {
    #[instrument(skip(self))]
    async fn find(&self, session_id: &str) -> RepoResult<Option<Session>> {
        let result = sqlx::query_as::<_, SessionModel>(
            r#"
            SELECT session_id, user_id, current_room_id, is_online, last_seen, created_at
            FROM sessions
            WHERE session_id = $1
            "#,
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        match result {
            Some(model) => {
                let history = self.load_history(session_id).await?;
                Ok(Some(model.into_entity(history)))
            }
            None => Ok(None),
        }
    }

    #[instrument(skip(self, session))]
    async fn insert_if_absent(&self, session: &Session) -> RepoResult<bool> {
        // First-writer-wins: a concurrent insert for the same token loses
        // silently and the caller re-reads the winner's row.
        let result = sqlx::query(
            r#"
            INSERT INTO sessions (session_id, user_id, current_room_id, is_online, last_seen, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (session_id) DO NOTHING
            "#,
        )
        .bind(&session.session_id)
        .bind(session.user_id.into_inner())
        .bind(session.current_room_id.map(Snowflake::into_inner))
        .bind(session.is_online)
        .bind(session.last_seen)
        .bind(session.created_at)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    async fn set_online(&self, session_id: &str, is_online: bool) -> RepoResult<()> {
        sqlx::query(
            r#"
            UPDATE sessions
            SET is_online = $2, last_seen = NOW()
            WHERE session_id = $1
            "#,
        )
        .bind(session_id)
        .bind(is_online)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn set_current_room(
        &self,
        session_id: &str,
        room_id: Option<Snowflake>,
    ) -> RepoResult<()> {
        sqlx::query(
            r#"
            UPDATE sessions
            SET current_room_id = $2, last_seen = NOW()
            WHERE session_id = $1
            "#,
        )
        .bind(session_id)
        .bind(room_id.map(Snowflake::into_inner))
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn add_history(&self, user_id: Snowflake, room_id: Snowflake) -> RepoResult<()> {
        // History is keyed by session; a user owns exactly one session row,
        // but the insert covers all of them to stay correct either way.
        sqlx::query(
            r#"
            INSERT INTO session_history (session_id, room_id, archived)
            SELECT session_id, $2, FALSE FROM sessions WHERE user_id = $1
            ON CONFLICT (session_id, room_id) DO NOTHING
            "#,
        )
        .bind(user_id.into_inner())
        .bind(room_id.into_inner())
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn set_archived(
        &self,
        session_id: &str,
        room_id: Snowflake,
        archived: bool,
    ) -> RepoResult<()> {
        sqlx::query(
            r#"
            UPDATE session_history
            SET archived = $3
            WHERE session_id = $1 AND room_id = $2
            "#,
        )
        .bind(session_id)
        .bind(room_id.into_inner())
        .bind(archived)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn remove_history(&self, session_id: &str, room_id: Snowflake) -> RepoResult<()> {
        sqlx::query(
            r#"
            DELETE FROM session_history
            WHERE session_id = $1 AND room_id = $2
            "#,
        )
        .bind(session_id)
        .bind(room_id.into_inner())
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repo_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<PgSessionRepository>();
    }
}
