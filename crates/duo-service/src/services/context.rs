//! Service context - dependency container for services
//!
//! Holds all repositories, cache stores, and other dependencies needed by
//! services.

use std::sync::Arc;

use duo_cache::{Publisher, RoomCache, SessionCache, SharedRedisPool};
use duo_common::RoomConfig;
use duo_core::{
    HistoryRecorder, MessageRepository, RoomRepository, SessionRepository, SnowflakeGenerator,
};
use duo_db::PgPool;

/// Dependency container handed to every service.
///
/// The cache stores and the publisher are derived from the Redis pool at
/// construction time, so callers only wire the pools, the repositories,
/// the history port, and the id generator.
#[derive(Clone)]
pub struct ServiceContext {
    pool: PgPool,
    redis_pool: SharedRedisPool,
    room_repo: Arc<dyn RoomRepository>,
    message_repo: Arc<dyn MessageRepository>,
    session_repo: Arc<dyn SessionRepository>,
    room_cache: RoomCache,
    session_cache: SessionCache,
    publisher: Publisher,
    history: Arc<dyn HistoryRecorder>,
    snowflake_generator: Arc<SnowflakeGenerator>,
    room_config: RoomConfig,
}

impl ServiceContext {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        pool: PgPool,
        redis_pool: SharedRedisPool,
        room_repo: Arc<dyn RoomRepository>,
        message_repo: Arc<dyn MessageRepository>,
        session_repo: Arc<dyn SessionRepository>,
        history: Arc<dyn HistoryRecorder>,
        snowflake_generator: Arc<SnowflakeGenerator>,
        room_config: RoomConfig,
    ) -> Self {
        let inner_pool = (*redis_pool).clone();
        let room_cache = RoomCache::new(inner_pool.clone());
        let session_cache = SessionCache::new(inner_pool.clone());
        let publisher = Publisher::new(inner_pool);

        Self {
            pool,
            redis_pool,
            room_repo,
            message_repo,
            session_repo,
            room_cache,
            session_cache,
            publisher,
            history,
            snowflake_generator,
            room_config,
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn redis_pool(&self) -> &SharedRedisPool {
        &self.redis_pool
    }

    pub fn room_repo(&self) -> &dyn RoomRepository {
        self.room_repo.as_ref()
    }

    pub fn message_repo(&self) -> &dyn MessageRepository {
        self.message_repo.as_ref()
    }

    pub fn session_repo(&self) -> &dyn SessionRepository {
        self.session_repo.as_ref()
    }

    pub fn room_cache(&self) -> &RoomCache {
        &self.room_cache
    }

    pub fn session_cache(&self) -> &SessionCache {
        &self.session_cache
    }

    pub fn publisher(&self) -> &Publisher {
        &self.publisher
    }

    /// Chat history port, implemented by the session directory.
    pub fn history(&self) -> &dyn HistoryRecorder {
        self.history.as_ref()
    }

    pub fn snowflake_generator(&self) -> &SnowflakeGenerator {
        self.snowflake_generator.as_ref()
    }

    /// Mint a fresh id.
    pub fn generate_id(&self) -> duo_core::Snowflake {
        self.snowflake_generator.generate()
    }

    pub fn room_config(&self) -> &RoomConfig {
        &self.room_config
    }
}

impl std::fmt::Debug for ServiceContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceContext")
            .field("pool", &"PgPool")
            .field("redis_pool", &"SharedRedisPool")
            .field("repositories", &"...")
            .field("cache_stores", &"...")
            .finish()
    }
}

/// Builder for creating ServiceContext with custom configuration
pub struct ServiceContextBuilder {
    pool: Option<PgPool>,
    redis_pool: Option<SharedRedisPool>,
    room_repo: Option<Arc<dyn RoomRepository>>,
    message_repo: Option<Arc<dyn MessageRepository>>,
    session_repo: Option<Arc<dyn SessionRepository>>,
    history: Option<Arc<dyn HistoryRecorder>>,
    snowflake_generator: Option<Arc<SnowflakeGenerator>>,
    room_config: RoomConfig,
}

impl ServiceContextBuilder {
    pub fn new() -> Self {
        Self {
            pool: None,
            redis_pool: None,
            room_repo: None,
            message_repo: None,
            session_repo: None,
            history: None,
            snowflake_generator: None,
            room_config: RoomConfig::default(),
        }
    }

    pub fn pool(mut self, pool: PgPool) -> Self {
        self.pool = Some(pool);
        self
    }

    pub fn redis_pool(mut self, redis_pool: SharedRedisPool) -> Self {
        self.redis_pool = Some(redis_pool);
        self
    }

    pub fn room_repo(mut self, repo: Arc<dyn RoomRepository>) -> Self {
        self.room_repo = Some(repo);
        self
    }

    pub fn message_repo(mut self, repo: Arc<dyn MessageRepository>) -> Self {
        self.message_repo = Some(repo);
        self
    }

    pub fn session_repo(mut self, repo: Arc<dyn SessionRepository>) -> Self {
        self.session_repo = Some(repo);
        self
    }

    pub fn history(mut self, history: Arc<dyn HistoryRecorder>) -> Self {
        self.history = Some(history);
        self
    }

    pub fn snowflake_generator(mut self, generator: Arc<SnowflakeGenerator>) -> Self {
        self.snowflake_generator = Some(generator);
        self
    }

    pub fn room_config(mut self, config: RoomConfig) -> Self {
        self.room_config = config;
        self
    }

    /// Build the ServiceContext
    ///
    /// # Errors
    /// Returns `ServiceError::Validation` if any required dependency is missing
    pub fn build(self) -> super::error::ServiceResult<ServiceContext> {
        use super::error::ServiceError;

        Ok(ServiceContext::new(
            self.pool
                .ok_or_else(|| ServiceError::validation("pool is required"))?,
            self.redis_pool
                .ok_or_else(|| ServiceError::validation("redis_pool is required"))?,
            self.room_repo
                .ok_or_else(|| ServiceError::validation("room_repo is required"))?,
            self.message_repo
                .ok_or_else(|| ServiceError::validation("message_repo is required"))?,
            self.session_repo
                .ok_or_else(|| ServiceError::validation("session_repo is required"))?,
            self.history
                .ok_or_else(|| ServiceError::validation("history is required"))?,
            self.snowflake_generator
                .ok_or_else(|| ServiceError::validation("snowflake_generator is required"))?,
            self.room_config,
        ))
    }
}

impl Default for ServiceContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}
