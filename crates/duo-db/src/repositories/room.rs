//! PostgreSQL implementation of RoomRepository

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::instrument;

use duo_core::{Participant, RepoResult, Room, RoomCode, RoomRepository, RoomStatus, Snowflake};

use crate::models::{ParticipantModel, RoomModel};

use super::error::map_db_error;

/// PostgreSQL implementation of RoomRepository
#[derive(Clone)]
pub struct PgRoomRepository {
    pool: PgPool,
}

impl PgRoomRepository {
    /// Create a new PgRoomRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Load the full participant roster for a room
    async fn load_participants(&self, room_id: i64) -> RepoResult<Vec<ParticipantModel>> {
        sqlx::query_as::<_, ParticipantModel>(
            r#"
            SELECT room_id, user_id, display_name, joined_at, is_active, left_at
            FROM room_participants
            WHERE room_id = $1
            ORDER BY joined_at
            "#,
        )
        .bind(room_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)
    }

    async fn assemble(&self, model: Option<RoomModel>) -> RepoResult<Option<Room>> {
        match model {
            Some(model) => {
                let participants = self.load_participants(model.id).await?;
                Ok(Some(model.into_entity(participants)?))
            }
            None => Ok(None),
        }
    }

    /// Lock the room row for the rest of the transaction and return its
    /// capacity, or `None` if the room is missing or closed
    async fn lock_room_capacity(
        tx: &mut Transaction<'_, Postgres>,
        room_id: Snowflake,
    ) -> RepoResult<Option<i64>> {
        let row: Option<(i32,)> = sqlx::query_as(
            r#"
            SELECT max_participants
            FROM rooms
            WHERE id = $1 AND status = 'active'
            FOR UPDATE
            "#,
        )
        .bind(room_id.into_inner())
        .fetch_optional(&mut **tx)
        .await
        .map_err(map_db_error)?;

        Ok(row.map(|(max,)| i64::from(max)))
    }

    async fn active_count(
        tx: &mut Transaction<'_, Postgres>,
        room_id: Snowflake,
    ) -> RepoResult<i64> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM room_participants WHERE room_id = $1 AND is_active",
        )
        .bind(room_id.into_inner())
        .fetch_one(&mut **tx)
        .await
        .map_err(map_db_error)?;

        Ok(count)
    }
}

#[async_trait]
impl RoomRepository for PgRoomRepository {
    #[instrument(skip(self))]
    async fn find_by_id(&self, id: Snowflake) -> RepoResult<Option<Room>> {
        let result = sqlx::query_as::<_, RoomModel>(
            r#"
            SELECT id, code, max_participants, status, created_at, closed_at, expires_at
            FROM rooms
            WHERE id = $1
            "#,
        )
        .bind(id.into_inner())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        self.assemble(result).await
    }

    #[instrument(skip(self))]
    async fn find_by_code(&self, code: &RoomCode) -> RepoResult<Option<Room>> {
        let result = sqlx::query_as::<_, RoomModel>(
            r#"
            SELECT id, code, max_participants, status, created_at, closed_at, expires_at
            FROM rooms
            WHERE code = $1
            "#,
        )
        .bind(code.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        self.assemble(result).await
    }

    #[instrument(skip(self, room))]
    async fn try_create(&self, room: &Room) -> RepoResult<bool> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        let status = match room.status {
            RoomStatus::Active => "active",
            RoomStatus::Closed => "closed",
        };

        let result = sqlx::query(
            r#"
            INSERT INTO rooms (id, code, max_participants, status, created_at, closed_at, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (code) DO NOTHING
            "#,
        )
        .bind(room.id.into_inner())
        .bind(room.code.as_str())
        .bind(i32::try_from(room.max_participants).unwrap_or(2))
        .bind(status)
        .bind(room.created_at)
        .bind(room.closed_at)
        .bind(room.expires_at)
        .execute(&mut *tx)
        .await
        .map_err(map_db_error)?;

        if result.rows_affected() == 0 {
            tx.rollback().await.map_err(map_db_error)?;
            return Ok(false);
        }

        for p in &room.participants {
            sqlx::query(
                r#"
                INSERT INTO room_participants (room_id, user_id, display_name, joined_at, is_active, left_at)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(room.id.into_inner())
            .bind(p.user_id.into_inner())
            .bind(&p.display_name)
            .bind(p.joined_at)
            .bind(p.is_active)
            .bind(p.left_at)
            .execute(&mut *tx)
            .await
            .map_err(map_db_error)?;
        }

        tx.commit().await.map_err(map_db_error)?;
        Ok(true)
    }

    #[instrument(skip(self, participant))]
    async fn append_participant_if_capacity(
        &self,
        room_id: Snowflake,
        participant: &Participant,
    ) -> RepoResult<bool> {
        // Joins serialize on the room row: under READ COMMITTED a plain
        // count can miss a concurrent joiner's uncommitted insert, so the
        // lock must come before the capacity check.
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        let Some(capacity) = Self::lock_room_capacity(&mut tx, room_id).await? else {
            tx.rollback().await.map_err(map_db_error)?;
            return Ok(false);
        };
        if Self::active_count(&mut tx, room_id).await? >= capacity {
            tx.rollback().await.map_err(map_db_error)?;
            return Ok(false);
        }

        let result = sqlx::query(
            r#"
            INSERT INTO room_participants (room_id, user_id, display_name, joined_at, is_active, left_at)
            VALUES ($1, $2, $3, $4, TRUE, NULL)
            ON CONFLICT (room_id, user_id) DO NOTHING
            "#,
        )
        .bind(room_id.into_inner())
        .bind(participant.user_id.into_inner())
        .bind(&participant.display_name)
        .bind(participant.joined_at)
        .execute(&mut *tx)
        .await
        .map_err(map_db_error)?;

        tx.commit().await.map_err(map_db_error)?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    async fn reactivate_participant(
        &self,
        room_id: Snowflake,
        user_id: Snowflake,
    ) -> RepoResult<bool> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        let Some(capacity) = Self::lock_room_capacity(&mut tx, room_id).await? else {
            tx.rollback().await.map_err(map_db_error)?;
            return Ok(false);
        };
        if Self::active_count(&mut tx, room_id).await? >= capacity {
            tx.rollback().await.map_err(map_db_error)?;
            return Ok(false);
        }

        let result = sqlx::query(
            r#"
            UPDATE room_participants
            SET is_active = TRUE, left_at = NULL
            WHERE room_id = $1 AND user_id = $2 AND NOT is_active
            "#,
        )
        .bind(room_id.into_inner())
        .bind(user_id.into_inner())
        .execute(&mut *tx)
        .await
        .map_err(map_db_error)?;

        tx.commit().await.map_err(map_db_error)?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    async fn deactivate_participant(
        &self,
        room_id: Snowflake,
        user_id: Snowflake,
    ) -> RepoResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE room_participants
            SET is_active = FALSE, left_at = NOW()
            WHERE room_id = $1 AND user_id = $2 AND is_active
            "#,
        )
        .bind(room_id.into_inner())
        .bind(user_id.into_inner())
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    async fn close_if_all_inactive(&self, room_id: Snowflake) -> RepoResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE rooms
            SET status = 'closed', closed_at = NOW()
            WHERE id = $1 AND status = 'active'
              AND EXISTS (SELECT 1 FROM room_participants WHERE room_id = $1)
              AND NOT EXISTS (SELECT 1 FROM room_participants WHERE room_id = $1 AND is_active)
            "#,
        )
        .bind(room_id.into_inner())
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    async fn close(&self, room_id: Snowflake) -> RepoResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE rooms
            SET status = 'closed', closed_at = NOW()
            WHERE id = $1 AND status = 'active'
            "#,
        )
        .bind(room_id.into_inner())
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repo_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<PgRoomRepository>();
    }
}
