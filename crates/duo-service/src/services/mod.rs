//! Service layer - use cases over the repositories and caches

mod context;
mod error;
mod message_store;
mod room_registry;
mod sanitize;
mod session_directory;

pub use context::{ServiceContext, ServiceContextBuilder};
pub use error::{ServiceError, ServiceResult};
pub use message_store::MessageStore;
pub use room_registry::{JoinOutcome, LeaveOutcome, RoomRegistry};
pub use sanitize::sanitize_content;
pub use session_directory::{SessionDirectory, SessionHistoryRecorder};
