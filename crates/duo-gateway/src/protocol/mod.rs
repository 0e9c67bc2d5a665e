//! Wire protocol for the WebSocket gateway

mod messages;

pub use messages::{ClientEvent, ServerEvent};
