//! PostgreSQL implementation of MessageRepository
//!
//! Soft-deleted messages stay in every listing so the log keeps its shape;
//! only their content is gone.

use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::HashMap;
use tracing::instrument;

use duo_core::{
    ContentType, Message, MessageQuery, MessageRepository, Reaction, ReactionKind, RepoResult,
    Snowflake,
};

use crate::models::{MessageModel, ReactionModel};

use super::error::map_db_error;

const MESSAGE_COLUMNS: &str = "id, room_id, sender_id, sender_name, content, content_type, is_deleted, deleted_by, deleted_by_name, created_at";

/// PostgreSQL implementation of MessageRepository
#[derive(Clone)]
pub struct PgMessageRepository {
    pool: PgPool,
}

impl PgMessageRepository {
    /// Create a new PgMessageRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Load reactions for a batch of messages, grouped by message id
    async fn load_reactions_for(
        &self,
        message_ids: &[i64],
    ) -> RepoResult<HashMap<i64, Vec<ReactionModel>>> {
        if message_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = sqlx::query_as::<_, ReactionModel>(
            r#"
            SELECT message_id, user_id, kind, created_at
            FROM message_reactions
            WHERE message_id = ANY($1)
            ORDER BY created_at
            "#,
        )
        .bind(message_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        let mut grouped: HashMap<i64, Vec<ReactionModel>> = HashMap::new();
        for row in rows {
            grouped.entry(row.message_id).or_default().push(row);
        }
        Ok(grouped)
    }

    async fn assemble(&self, models: Vec<MessageModel>) -> RepoResult<Vec<Message>> {
        let ids: Vec<i64> = models.iter().map(|m| m.id).collect();
        let mut reactions = self.load_reactions_for(&ids).await?;

        models
            .into_iter()
            .map(|m| {
                let batch = reactions.remove(&m.id).unwrap_or_default();
                m.into_entity(batch)
            })
            .collect()
    }
}

#[async_trait]
impl MessageRepository for PgMessageRepository {
    #[instrument(skip(self))]
    async fn find_by_id(&self, id: Snowflake) -> RepoResult<Option<Message>> {
        let result = sqlx::query_as::<_, MessageModel>(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = $1"
        ))
        .bind(id.into_inner())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        match result {
            Some(model) => {
                let reactions = self
                    .load_reactions_for(&[model.id])
                    .await?
                    .remove(&model.id)
                    .unwrap_or_default();
                Ok(Some(model.into_entity(reactions)?))
            }
            None => Ok(None),
        }
    }

    #[instrument(skip(self))]
    async fn find_by_room(
        &self,
        room_id: Snowflake,
        query: MessageQuery,
    ) -> RepoResult<Vec<Message>> {
        // Page-size policy lives in the service layer, which asks for one
        // row past its public maximum to detect another page; only guard
        // against a non-positive limit here.
        let limit = query.limit.max(1);

        let results = match (query.before, query.after) {
            (Some(before), None) => {
                // Fetch messages before cursor (scrolling up)
                sqlx::query_as::<_, MessageModel>(&format!(
                    r#"
                    SELECT {MESSAGE_COLUMNS}
                    FROM messages
                    WHERE room_id = $1 AND id < $2
                    ORDER BY id DESC
                    LIMIT $3
                    "#
                ))
                .bind(room_id.into_inner())
                .bind(before.into_inner())
                .bind(limit)
                .fetch_all(&self.pool)
                .await
            }
            (None, Some(after)) => {
                // Fetch messages after cursor (scrolling down)
                sqlx::query_as::<_, MessageModel>(&format!(
                    r#"
                    SELECT {MESSAGE_COLUMNS}
                    FROM messages
                    WHERE room_id = $1 AND id > $2
                    ORDER BY id ASC
                    LIMIT $3
                    "#
                ))
                .bind(room_id.into_inner())
                .bind(after.into_inner())
                .bind(limit)
                .fetch_all(&self.pool)
                .await
            }
            _ => {
                // Fetch latest messages (no cursor)
                sqlx::query_as::<_, MessageModel>(&format!(
                    r#"
                    SELECT {MESSAGE_COLUMNS}
                    FROM messages
                    WHERE room_id = $1
                    ORDER BY id DESC
                    LIMIT $2
                    "#
                ))
                .bind(room_id.into_inner())
                .bind(limit)
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(map_db_error)?;

        self.assemble(results).await
    }

    #[instrument(skip(self, message))]
    async fn create(&self, message: &Message) -> RepoResult<()> {
        let content_type = match message.content_type {
            ContentType::Text => "text",
            ContentType::Emoji => "emoji",
        };

        sqlx::query(
            r#"
            INSERT INTO messages (id, room_id, sender_id, sender_name, content, content_type, is_deleted, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, FALSE, $7)
            "#,
        )
        .bind(message.id.into_inner())
        .bind(message.room_id.into_inner())
        .bind(message.sender_id.into_inner())
        .bind(&message.sender_name)
        .bind(&message.content)
        .bind(content_type)
        .bind(message.created_at)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn soft_delete(
        &self,
        id: Snowflake,
        deleted_by: Snowflake,
        deleted_by_name: &str,
    ) -> RepoResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE messages
            SET content = '', is_deleted = TRUE, deleted_by = $2, deleted_by_name = $3
            WHERE id = $1 AND NOT is_deleted
            "#,
        )
        .bind(id.into_inner())
        .bind(deleted_by.into_inner())
        .bind(deleted_by_name)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    async fn latest(&self, room_id: Snowflake) -> RepoResult<Option<Message>> {
        let result = sqlx::query_as::<_, MessageModel>(&format!(
            r#"
            SELECT {MESSAGE_COLUMNS}
            FROM messages
            WHERE room_id = $1
            ORDER BY id DESC
            LIMIT 1
            "#
        ))
        .bind(room_id.into_inner())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        match result {
            Some(model) => {
                let reactions = self
                    .load_reactions_for(&[model.id])
                    .await?
                    .remove(&model.id)
                    .unwrap_or_default();
                Ok(Some(model.into_entity(reactions)?))
            }
            None => Ok(None),
        }
    }

    #[instrument(skip(self, reaction))]
    async fn add_reaction(&self, message_id: Snowflake, reaction: &Reaction) -> RepoResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO message_reactions (message_id, user_id, kind, created_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (message_id, user_id, kind) DO NOTHING
            "#,
        )
        .bind(message_id.into_inner())
        .bind(reaction.user_id.into_inner())
        .bind(reaction.kind.as_str())
        .bind(reaction.created_at)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    async fn remove_reaction(
        &self,
        message_id: Snowflake,
        user_id: Snowflake,
        kind: ReactionKind,
    ) -> RepoResult<bool> {
        let result = sqlx::query(
            r#"
            DELETE FROM message_reactions
            WHERE message_id = $1 AND user_id = $2 AND kind = $3
            "#,
        )
        .bind(message_id.into_inner())
        .bind(user_id.into_inner())
        .bind(kind.as_str())
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    async fn find_reactions(&self, message_id: Snowflake) -> RepoResult<Vec<Reaction>> {
        let rows = sqlx::query_as::<_, ReactionModel>(
            r#"
            SELECT message_id, user_id, kind, created_at
            FROM message_reactions
            WHERE message_id = $1
            ORDER BY created_at
            "#,
        )
        .bind(message_id.into_inner())
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        rows.into_iter().map(ReactionModel::into_entity).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repo_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<PgMessageRepository>();
    }
}
