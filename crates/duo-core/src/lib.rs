//! # duo-core
//!
//! Domain layer for the pair-chat service: entities (rooms, sessions,
//! messages), value objects (ids, room codes), domain errors, and the
//! repository traits the storage crates implement. Deliberately free of
//! infrastructure dependencies.

pub mod entities;
pub mod error;
pub mod traits;
pub mod value_objects;

pub use entities::{
    ContentType, Message, MessagePage, Participant, Reaction, ReactionKind, Room, RoomStatus,
    Session,
};
pub use error::DomainError;
pub use traits::{
    HistoryRecorder, MessageQuery, MessageRepository, RepoResult, RoomRepository,
    SessionRepository,
};
pub use value_objects::{
    RoomCode, RoomCodeParseError, Snowflake, SnowflakeGenerator, SnowflakeParseError,
};
