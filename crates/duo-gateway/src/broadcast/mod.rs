//! Cross-instance event fan-out

mod bridge;
mod dispatcher;

pub use bridge::{DeliveryMode, PubSubBridge};
pub use dispatcher::{EventDispatcher, EventDispatcherConfig};
