//! Per-session event rate limiting

mod rate_limiter;

pub use rate_limiter::{EventLimit, RateLimiter, RateLimiterConfig};
