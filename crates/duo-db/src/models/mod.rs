//! Database models with SQLx `FromRow` derives
//!
//! Models mirror table rows; each carries its conversion into the
//! corresponding domain entity.

mod message;
mod room;
mod session;

pub use message::{MessageModel, ReactionModel};
pub use room::{ParticipantModel, RoomModel};
pub use session::{HistoryModel, SessionModel};
