//! Gateway server setup
//!
//! Wires the pools, repositories, services, pub/sub bridge, and rate
//! limiter together, and runs the axum server.

mod handler;
mod state;

pub use handler::gateway_handler;
pub use state::GatewayState;

use crate::broadcast::{DeliveryMode, EventDispatcher, EventDispatcherConfig, PubSubBridge};
use crate::connection::ConnectionManager;
use crate::limiter::{RateLimiter, RateLimiterConfig};
use axum::{extract::State, http::StatusCode, routing::get, Router};
use duo_cache::{RedisPool, RedisPoolConfig};
use duo_common::{AppConfig, AppError};
use duo_service::{ServiceContextBuilder, SessionHistoryRecorder};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

/// How often the rate limiter sweeps expired entries
const LIMITER_SWEEP_PERIOD: Duration = Duration::from_secs(30);

/// Create the gateway router
pub fn create_router() -> Router<GatewayState> {
    Router::new()
        .route("/ws", get(gateway_handler))
        .route("/health", get(health_check))
}

/// Health check endpoint: verifies both backing stores are reachable
async fn health_check(State(state): State<GatewayState>) -> (StatusCode, &'static str) {
    let ctx = state.service_context();

    if let Err(e) = duo_db::pool::health_check(ctx.pool()).await {
        tracing::warn!(error = %e, "Health check: database unreachable");
        return (StatusCode::SERVICE_UNAVAILABLE, "database unreachable");
    }

    if let Err(e) = ctx.redis_pool().health_check().await {
        tracing::warn!(error = %e, "Health check: redis unreachable");
        return (StatusCode::SERVICE_UNAVAILABLE, "redis unreachable");
    }

    (StatusCode::OK, "OK")
}

/// Build the complete application
pub fn create_app(state: GatewayState) -> Router {
    create_router()
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Initialize all dependencies and create `GatewayState`
pub async fn create_gateway_state(config: AppConfig) -> Result<GatewayState, AppError> {
    tracing::info!("Connecting to PostgreSQL...");
    let db_config = duo_db::DatabaseConfig {
        url: config.database.url.clone(),
        max_connections: config.database.max_connections,
        min_connections: config.database.min_connections,
        ..Default::default()
    };
    let pool = duo_db::create_pool(&db_config)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;
    tracing::info!("PostgreSQL connection established");

    tracing::info!("Connecting to Redis...");
    let redis_config = RedisPoolConfig::from(&config.redis);
    let redis_pool = RedisPool::new(redis_config).map_err(|e| AppError::Cache(e.to_string()))?;
    let shared_redis = Arc::new(redis_pool);
    tracing::info!("Redis connection established");

    let snowflake_generator = Arc::new(duo_core::SnowflakeGenerator::new(
        config.snowflake.worker_id,
    ));
    let instance_id = format!("gw-{}", snowflake_generator.generate());

    let room_repo = Arc::new(duo_db::PgRoomRepository::new(pool.clone()));
    let message_repo = Arc::new(duo_db::PgMessageRepository::new(pool.clone()));
    let session_repo = Arc::new(duo_db::PgSessionRepository::new(pool.clone()));
    let history = Arc::new(SessionHistoryRecorder::new(session_repo.clone()));

    let service_context = ServiceContextBuilder::new()
        .pool(pool)
        .redis_pool(shared_redis.clone())
        .room_repo(room_repo)
        .message_repo(message_repo)
        .session_repo(session_repo)
        .history(history)
        .snowflake_generator(snowflake_generator)
        .room_config(config.room.clone())
        .build()
        .map_err(|e| AppError::Config(e.to_string()))?;

    let connection_manager = ConnectionManager::new_shared();

    // The dispatcher owns the Redis subscription; without it the bridge
    // can only reach sockets on this instance
    let dispatcher_config = EventDispatcherConfig {
        redis_url: config.redis.url.clone(),
        ..EventDispatcherConfig::default()
    };
    let (dispatcher, delivery_mode) = match EventDispatcher::new(
        dispatcher_config,
        connection_manager.clone(),
        instance_id.clone(),
    )
    .await
    {
        Ok(dispatcher) => {
            let dispatcher = Arc::new(dispatcher);
            dispatcher.clone().start();
            (Some(dispatcher), DeliveryMode::Redis)
        }
        Err(e) => {
            tracing::warn!(
                error = %e,
                "Redis pub/sub unavailable, running in local-only delivery mode"
            );
            (None, DeliveryMode::LocalOnly)
        }
    };

    let bridge = PubSubBridge::new(
        connection_manager.clone(),
        service_context.publisher().clone(),
        instance_id,
        delivery_mode,
    );

    let rate_limiter = RateLimiter::new_shared(RateLimiterConfig::from(&config.rate_limit));
    rate_limiter.clone().spawn_sweeper(LIMITER_SWEEP_PERIOD);

    Ok(GatewayState::new(
        service_context,
        connection_manager,
        bridge,
        dispatcher,
        rate_limiter,
        config,
    ))
}

/// Run the gateway server until shutdown
pub async fn run_server(app: Router, addr: SocketAddr) -> Result<(), AppError> {
    tracing::info!("Starting gateway server on {}", addr);

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| AppError::Config(format!("Failed to bind to {addr}: {e}")))?;

    tracing::info!("Gateway listening on ws://{}/ws", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| AppError::Config(format!("Server error: {e}")))?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install shutdown handler");
        return;
    }
    tracing::info!("Shutdown signal received");
}

/// Run the complete gateway server with configuration
pub async fn run(config: AppConfig) -> Result<(), AppError> {
    let addr: SocketAddr = config
        .gateway
        .address()
        .parse()
        .map_err(|e| AppError::Config(format!("Invalid gateway address: {e}")))?;

    let state = create_gateway_state(config).await?;
    let dispatcher = state.dispatcher().cloned();

    let app = create_app(state);
    let result = run_server(app, addr).await;

    if let Some(dispatcher) = dispatcher {
        dispatcher.stop().await;
    }

    result
}
