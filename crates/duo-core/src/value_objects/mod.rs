//! Value objects - immutable domain values

mod room_code;
mod snowflake;

pub use room_code::{RoomCode, RoomCodeParseError};
pub use snowflake::{Snowflake, SnowflakeGenerator, SnowflakeParseError};
