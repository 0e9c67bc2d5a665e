//! Session and presence cache

mod session_cache;

pub use session_cache::{CachedSession, SessionCache};
