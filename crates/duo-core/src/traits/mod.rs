//! Repository traits (ports) - define the interface for data access

mod history;
mod repositories;

pub use history::HistoryRecorder;
pub use repositories::{
    MessageQuery, MessageRepository, RepoResult, RoomRepository, SessionRepository,
};
