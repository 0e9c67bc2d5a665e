//! Sliding-window rate limiter
//!
//! Counts events per (session, event-type) window and blocks a session
//! outright once it exceeds a limit. State is process-local; behind a
//! load balancer the counters must move to the shared fast store or a
//! reconnect reaches a fresh limiter.

use dashmap::DashMap;
use duo_common::RateLimitConfig;
use duo_core::DomainError;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A single event-type limit
#[derive(Debug, Clone, Copy)]
pub struct EventLimit {
    /// Events allowed per window
    pub max: u32,
    pub window: Duration,
}

impl EventLimit {
    pub const fn new(max: u32, window_secs: u64) -> Self {
        Self {
            max,
            window: Duration::from_secs(window_secs),
        }
    }
}

/// Per-event-type limits plus the block penalty
#[derive(Debug, Clone)]
pub struct RateLimiterConfig {
    pub send_message: EventLimit,
    pub typing: EventLimit,
    pub reactions: EventLimit,
    pub delete_message: EventLimit,
    pub room_membership: EventLimit,
    pub default: EventLimit,
    /// How long an offending session stays blocked
    pub block_duration: Duration,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            send_message: EventLimit::new(25, 10),
            typing: EventLimit::new(20, 5),
            reactions: EventLimit::new(15, 10),
            delete_message: EventLimit::new(10, 10),
            room_membership: EventLimit::new(10, 10),
            default: EventLimit::new(30, 10),
            block_duration: Duration::from_secs(10),
        }
    }
}

impl From<&RateLimitConfig> for RateLimiterConfig {
    fn from(config: &RateLimitConfig) -> Self {
        Self {
            send_message: EventLimit::new(config.message_limit, config.window_secs),
            block_duration: Duration::from_secs(config.block_secs),
            ..Self::default()
        }
    }
}

impl RateLimiterConfig {
    fn limit_for(&self, event: &str) -> EventLimit {
        match event {
            "send_message" => self.send_message,
            "typing" => self.typing,
            "add_reaction" | "remove_reaction" => self.reactions,
            "delete_message" => self.delete_message,
            "join_room" | "leave_room" => self.room_membership,
            _ => self.default,
        }
    }
}

/// One counting window
#[derive(Debug, Clone, Copy)]
struct Window {
    count: u32,
    started_at: Instant,
}

/// Process-local rate limiter
pub struct RateLimiter {
    config: RateLimiterConfig,
    /// (session token, event type) -> current window
    windows: DashMap<(String, &'static str), Window>,
    /// Session token -> instant the block expires
    blocks: DashMap<String, Instant>,
}

impl RateLimiter {
    #[must_use]
    pub fn new(config: RateLimiterConfig) -> Self {
        Self {
            config,
            windows: DashMap::new(),
            blocks: DashMap::new(),
        }
    }

    #[must_use]
    pub fn new_shared(config: RateLimiterConfig) -> Arc<Self> {
        Arc::new(Self::new(config))
    }

    /// Admit or reject an event for a session
    ///
    /// Rejections carry the seconds the client should wait. A blocked
    /// session is rejected for every event type until the block expires.
    pub fn check(&self, session_id: &str, event: &'static str) -> Result<(), DomainError> {
        let now = Instant::now();

        if let Some(blocked_until) = self.blocks.get(session_id).map(|b| *b) {
            if now < blocked_until {
                return Err(DomainError::RateLimitExceeded {
                    retry_after_secs: remaining_secs(blocked_until, now),
                });
            }
            self.blocks.remove(session_id);
            // The windows that earned the block are stale once it lapses
            self.windows.retain(|(sid, _), _| sid != session_id);
        }

        let limit = self.config.limit_for(event);
        let mut entry = self
            .windows
            .entry((session_id.to_string(), event))
            .or_insert(Window {
                count: 0,
                started_at: now,
            });

        if now.duration_since(entry.started_at) >= limit.window {
            entry.count = 0;
            entry.started_at = now;
        }

        entry.count += 1;
        if entry.count > limit.max {
            let blocked_until = now + self.config.block_duration;
            drop(entry);
            self.blocks.insert(session_id.to_string(), blocked_until);

            tracing::warn!(session_id, event, "Session rate limited");
            return Err(DomainError::RateLimitExceeded {
                retry_after_secs: remaining_secs(blocked_until, now),
            });
        }

        Ok(())
    }

    /// Whether a session is currently blocked
    pub fn is_blocked(&self, session_id: &str) -> bool {
        self.blocks
            .get(session_id)
            .is_some_and(|b| Instant::now() < *b)
    }

    /// Drop a session's counting windows on disconnect
    ///
    /// An active block stays in place until it expires; otherwise a
    /// blocked client could lift its penalty by reconnecting with the
    /// same token.
    pub fn forget(&self, session_id: &str) {
        self.windows.retain(|(sid, _), _| sid != session_id);
    }

    /// Remove expired windows and blocks to bound memory
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let before = self.windows.len() + self.blocks.len();

        self.windows.retain(|(_, event), window| {
            now.duration_since(window.started_at) < self.config.limit_for(event).window
        });
        self.blocks.retain(|_, blocked_until| now < *blocked_until);

        before - (self.windows.len() + self.blocks.len())
    }

    /// Spawn the periodic sweep task
    pub fn spawn_sweeper(self: Arc<Self>, period: Duration) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                let removed = self.sweep();
                if removed > 0 {
                    tracing::debug!(removed, "Rate limiter entries swept");
                }
            }
        })
    }
}

fn remaining_secs(until: Instant, now: Instant) -> u64 {
    let remaining = until.saturating_duration_since(now);
    // Round up so "retry after 0s" is never sent while still blocked
    u64::from(remaining.subsec_nanos() > 0) + remaining.as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter() -> RateLimiter {
        RateLimiter::new(RateLimiterConfig::default())
    }

    #[test]
    fn test_allows_up_to_limit() {
        let limiter = limiter();
        for _ in 0..25 {
            assert!(limiter.check("tok", "send_message").is_ok());
        }
    }

    #[test]
    fn test_rejects_and_blocks_past_limit() {
        let limiter = limiter();
        for _ in 0..25 {
            limiter.check("tok", "send_message").ok();
        }

        let err = limiter.check("tok", "send_message").unwrap_err();
        assert!(matches!(
            err,
            DomainError::RateLimitExceeded { retry_after_secs } if retry_after_secs > 0
        ));
        assert!(limiter.is_blocked("tok"));

        // The block covers every event type, not just the offender
        assert!(limiter.check("tok", "typing").is_err());
    }

    #[test]
    fn test_sessions_are_independent() {
        let limiter = limiter();
        for _ in 0..26 {
            limiter.check("tok-a", "send_message").ok();
        }

        assert!(limiter.is_blocked("tok-a"));
        assert!(limiter.check("tok-b", "send_message").is_ok());
    }

    #[test]
    fn test_event_types_count_separately() {
        let limiter = limiter();
        for _ in 0..25 {
            assert!(limiter.check("tok", "send_message").is_ok());
        }
        // Different bucket, still admitted
        assert!(limiter.check("tok", "typing").is_ok());
    }

    #[test]
    fn test_forget_clears_windows_but_not_an_active_block() {
        let limiter = limiter();
        for _ in 0..26 {
            limiter.check("tok", "send_message").ok();
        }
        assert!(limiter.is_blocked("tok"));

        // Disconnecting and reconnecting does not lift the penalty
        limiter.forget("tok");
        assert!(limiter.is_blocked("tok"));
        assert!(limiter.check("tok", "send_message").is_err());
    }

    #[test]
    fn test_forget_resets_counters_for_unblocked_sessions() {
        let limiter = limiter();
        for _ in 0..25 {
            limiter.check("tok", "send_message").ok();
        }
        assert!(!limiter.is_blocked("tok"));

        limiter.forget("tok");
        assert!(limiter.check("tok", "send_message").is_ok());
    }

    #[test]
    fn test_block_expires_and_counting_restarts() {
        let config = RateLimiterConfig {
            send_message: EventLimit::new(2, 10),
            block_duration: Duration::from_millis(10),
            ..RateLimiterConfig::default()
        };
        let limiter = RateLimiter::new(config);

        for _ in 0..2 {
            assert!(limiter.check("tok", "send_message").is_ok());
        }
        assert!(limiter.check("tok", "send_message").is_err());
        assert!(limiter.is_blocked("tok"));

        std::thread::sleep(Duration::from_millis(20));
        assert!(!limiter.is_blocked("tok"));

        // The lapsed block also resets the window that earned it
        assert!(limiter.check("tok", "send_message").is_ok());
    }

    #[test]
    fn test_sweep_drops_expired_entries() {
        let config = RateLimiterConfig {
            send_message: EventLimit {
                max: 5,
                window: Duration::from_millis(0),
            },
            ..RateLimiterConfig::default()
        };
        let limiter = RateLimiter::new(config);

        limiter.check("tok", "send_message").ok();
        assert!(limiter.sweep() >= 1);
    }

    #[test]
    fn test_config_from_app_settings() {
        let app = RateLimitConfig {
            message_limit: 5,
            window_secs: 2,
            block_secs: 30,
        };
        let config = RateLimiterConfig::from(&app);
        assert_eq!(config.send_message.max, 5);
        assert_eq!(config.send_message.window, Duration::from_secs(2));
        assert_eq!(config.block_duration, Duration::from_secs(30));
    }
}
