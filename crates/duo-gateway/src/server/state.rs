//! Gateway state
//!
//! Shared dependencies for the WebSocket server.

use crate::broadcast::{EventDispatcher, PubSubBridge};
use crate::connection::ConnectionManager;
use crate::limiter::RateLimiter;
use duo_common::AppConfig;
use duo_service::ServiceContext;
use std::sync::Arc;

/// Gateway application state
#[derive(Clone)]
pub struct GatewayState {
    /// Service context with repositories and caches
    service_context: Arc<ServiceContext>,
    /// Registry of live sockets
    connection_manager: Arc<ConnectionManager>,
    /// Local + cross-instance fan-out
    bridge: Arc<PubSubBridge>,
    /// Redis subscriber loop; absent in local-only mode
    dispatcher: Option<Arc<EventDispatcher>>,
    /// Per-session event admission
    rate_limiter: Arc<RateLimiter>,
    /// Application configuration
    config: Arc<AppConfig>,
}

impl GatewayState {
    pub fn new(
        service_context: ServiceContext,
        connection_manager: Arc<ConnectionManager>,
        bridge: Arc<PubSubBridge>,
        dispatcher: Option<Arc<EventDispatcher>>,
        rate_limiter: Arc<RateLimiter>,
        config: AppConfig,
    ) -> Self {
        Self {
            service_context: Arc::new(service_context),
            connection_manager,
            bridge,
            dispatcher,
            rate_limiter,
            config: Arc::new(config),
        }
    }

    pub fn service_context(&self) -> &ServiceContext {
        &self.service_context
    }

    pub fn connection_manager(&self) -> &ConnectionManager {
        &self.connection_manager
    }

    pub fn bridge(&self) -> &PubSubBridge {
        &self.bridge
    }

    pub fn dispatcher(&self) -> Option<&Arc<EventDispatcher>> {
        self.dispatcher.as_ref()
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}

impl std::fmt::Debug for GatewayState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayState")
            .field("connection_manager", &self.connection_manager)
            .field("bridge", &self.bridge)
            .finish()
    }
}
