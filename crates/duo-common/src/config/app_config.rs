//! Typed application configuration loaded from environment variables.
//!
//! `DATABASE_URL`, `REDIS_URL`, and `GATEWAY_PORT` are required; everything
//! else falls back to a default. Unparseable optional values fall back
//! silently rather than failing startup.

use serde::Deserialize;
use std::env;
use std::str::FromStr;

/// Top-level configuration for the gateway process.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub app: AppSettings,
    pub gateway: ServerConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub rate_limit: RateLimitConfig,
    pub room: RoomConfig,
    pub snowflake: SnowflakeConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppSettings {
    #[serde(default = "defaults::app_name")]
    pub name: String,
    #[serde(default)]
    pub env: Environment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    #[must_use]
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    #[must_use]
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }

    fn from_env_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "production" => Some(Self::Production),
            "staging" => Some(Self::Staging),
            "development" => Some(Self::Development),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "defaults::host")]
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "defaults::db_max_connections")]
    pub max_connections: u32,
    #[serde(default = "defaults::db_min_connections")]
    pub min_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub url: String,
    #[serde(default = "defaults::redis_max_connections")]
    pub max_connections: u32,
}

/// Sliding-window rate limit settings, per session and event type.
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    /// Maximum `send_message` events per window.
    #[serde(default = "defaults::message_limit")]
    pub message_limit: u32,
    /// Window length in seconds.
    #[serde(default = "defaults::window_secs")]
    pub window_secs: u64,
    /// How long a session stays blocked after exceeding a limit.
    #[serde(default = "defaults::block_secs")]
    pub block_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            message_limit: defaults::message_limit(),
            window_secs: defaults::window_secs(),
            block_secs: defaults::block_secs(),
        }
    }
}

/// Room lifecycle settings.
#[derive(Debug, Clone, Deserialize)]
pub struct RoomConfig {
    /// Hours until a room expires; `None` disables expiry.
    #[serde(default = "defaults::room_ttl_hours")]
    pub ttl_hours: Option<i64>,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            ttl_hours: defaults::room_ttl_hours(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SnowflakeConfig {
    #[serde(default)]
    pub worker_id: u16,
}

mod defaults {
    pub fn app_name() -> String {
        "duo-chat".to_string()
    }

    pub fn host() -> String {
        "127.0.0.1".to_string()
    }

    pub fn db_max_connections() -> u32 {
        20
    }

    pub fn db_min_connections() -> u32 {
        5
    }

    pub fn redis_max_connections() -> u32 {
        10
    }

    pub fn message_limit() -> u32 {
        25
    }

    pub fn window_secs() -> u64 {
        10
    }

    pub fn block_secs() -> u64 {
        10
    }

    pub fn room_ttl_hours() -> Option<i64> {
        Some(24)
    }
}

/// Read a required variable.
fn require(name: &'static str) -> Result<String, ConfigError> {
    env::var(name).map_err(|_| ConfigError::MissingVar(name))
}

/// Read and parse an optional variable, `None` when absent or invalid.
fn parse_var<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|s| s.parse().ok())
}

impl AppConfig {
    /// Load configuration from the process environment.
    ///
    /// # Errors
    /// Returns an error if a required variable is missing.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        Ok(Self {
            app: AppSettings {
                name: env::var("APP_NAME").unwrap_or_else(|_| defaults::app_name()),
                env: env::var("APP_ENV")
                    .ok()
                    .and_then(|s| Environment::from_env_str(&s))
                    .unwrap_or_default(),
            },
            gateway: ServerConfig {
                host: env::var("GATEWAY_HOST").unwrap_or_else(|_| defaults::host()),
                port: parse_var("GATEWAY_PORT").ok_or(ConfigError::MissingVar("GATEWAY_PORT"))?,
            },
            database: DatabaseConfig {
                url: require("DATABASE_URL")?,
                max_connections: parse_var("DATABASE_MAX_CONNECTIONS")
                    .unwrap_or_else(defaults::db_max_connections),
                min_connections: parse_var("DATABASE_MIN_CONNECTIONS")
                    .unwrap_or_else(defaults::db_min_connections),
            },
            redis: RedisConfig {
                url: require("REDIS_URL")?,
                max_connections: parse_var("REDIS_MAX_CONNECTIONS")
                    .unwrap_or_else(defaults::redis_max_connections),
            },
            rate_limit: RateLimitConfig {
                message_limit: parse_var("RATE_LIMIT_MESSAGE_LIMIT")
                    .unwrap_or_else(defaults::message_limit),
                window_secs: parse_var("RATE_LIMIT_WINDOW_SECS")
                    .unwrap_or_else(defaults::window_secs),
                block_secs: parse_var("RATE_LIMIT_BLOCK_SECS")
                    .unwrap_or_else(defaults::block_secs),
            },
            room: RoomConfig {
                ttl_hours: match env::var("ROOM_TTL_HOURS") {
                    Ok(s) if s.eq_ignore_ascii_case("none") => None,
                    Ok(s) => s.parse().ok().or_else(defaults::room_ttl_hours),
                    Err(_) => defaults::room_ttl_hours(),
                },
            },
            snowflake: SnowflakeConfig {
                worker_id: parse_var("WORKER_ID").unwrap_or(0),
            },
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn environment_flags() {
        assert!(Environment::Production.is_production());
        assert!(!Environment::Staging.is_production());
        assert!(Environment::Development.is_development());
        assert!(!Environment::Production.is_development());
    }

    #[test]
    fn environment_parses_case_insensitively() {
        assert_eq!(
            Environment::from_env_str("PRODUCTION"),
            Some(Environment::Production)
        );
        assert_eq!(Environment::from_env_str("bogus"), None);
    }

    #[test]
    fn server_address_joins_host_and_port() {
        let config = ServerConfig {
            host: "0.0.0.0".to_string(),
            port: 8080,
        };
        assert_eq!(config.address(), "0.0.0.0:8080");
    }

    #[test]
    fn defaults_match_documented_limits() {
        let rate = RateLimitConfig::default();
        assert_eq!(rate.message_limit, 25);
        assert_eq!(rate.window_secs, 10);
        assert_eq!(rate.block_secs, 10);
        assert_eq!(RoomConfig::default().ttl_hours, Some(24));
    }
}
