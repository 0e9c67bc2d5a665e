//! Domain entities

mod message;
mod room;
mod session;

pub use message::{ContentType, Message, MessagePage, Reaction, ReactionKind};
pub use room::{Participant, Room, RoomStatus};
pub use session::Session;
