//! PostgreSQL repository implementations

mod error;
mod message;
mod room;
mod session;

pub use message::PgMessageRepository;
pub use room::PgRoomRepository;
pub use session::PgSessionRepository;
