//! Room snapshot cache

mod room_cache;

pub use room_cache::RoomCache;
