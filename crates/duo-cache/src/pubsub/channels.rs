//! Channel naming for Redis pub/sub.
//!
//! Room and user channels embed the target id after a fixed prefix;
//! anything that does not match a known prefix round-trips as `Custom`.

use duo_core::Snowflake;

pub const ROOM_CHANNEL_PREFIX: &str = "room:";
pub const USER_CHANNEL_PREFIX: &str = "user:";
pub const BROADCAST_CHANNEL: &str = "broadcast";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PubSubChannel {
    /// Events for one room, delivered to both participants.
    Room(Snowflake),
    /// Events for one user's session.
    User(Snowflake),
    /// Every connected client.
    Broadcast,
    /// A channel name outside the known prefixes.
    Custom(String),
}

impl PubSubChannel {
    #[must_use]
    pub fn room(room_id: Snowflake) -> Self {
        Self::Room(room_id)
    }

    #[must_use]
    pub fn user(user_id: Snowflake) -> Self {
        Self::User(user_id)
    }

    #[must_use]
    pub fn broadcast() -> Self {
        Self::Broadcast
    }

    /// The Redis channel name.
    #[must_use]
    pub fn name(&self) -> String {
        match self {
            Self::Room(id) => format!("{ROOM_CHANNEL_PREFIX}{id}"),
            Self::User(id) => format!("{USER_CHANNEL_PREFIX}{id}"),
            Self::Broadcast => BROADCAST_CHANNEL.to_string(),
            Self::Custom(name) => name.clone(),
        }
    }

    /// Recover the channel from a Redis channel name.
    #[must_use]
    pub fn parse(name: &str) -> Self {
        if name == BROADCAST_CHANNEL {
            return Self::Broadcast;
        }
        if let Some(id) = parse_id_suffix(name, ROOM_CHANNEL_PREFIX) {
            return Self::Room(id);
        }
        if let Some(id) = parse_id_suffix(name, USER_CHANNEL_PREFIX) {
            return Self::User(id);
        }
        Self::Custom(name.to_string())
    }
}

fn parse_id_suffix(name: &str, prefix: &str) -> Option<Snowflake> {
    name.strip_prefix(prefix)?.parse().ok()
}

impl std::fmt::Display for PubSubChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_embed_ids() {
        assert_eq!(PubSubChannel::room(Snowflake::new(12345)).name(), "room:12345");
        assert_eq!(PubSubChannel::user(Snowflake::new(11111)).name(), "user:11111");
        assert_eq!(PubSubChannel::broadcast().name(), "broadcast");
    }

    #[test]
    fn parse_inverts_name() {
        for channel in [
            PubSubChannel::room(Snowflake::new(12345)),
            PubSubChannel::user(Snowflake::new(11111)),
            PubSubChannel::broadcast(),
        ] {
            assert_eq!(PubSubChannel::parse(&channel.name()), channel);
        }
    }

    #[test]
    fn unknown_prefixes_become_custom() {
        assert_eq!(
            PubSubChannel::parse("unknown:123"),
            PubSubChannel::Custom("unknown:123".to_string())
        );
        // A room channel with a garbage id is not a room channel.
        assert_eq!(
            PubSubChannel::parse("room:abc"),
            PubSubChannel::Custom("room:abc".to_string())
        );
    }
}
