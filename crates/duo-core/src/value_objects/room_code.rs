//! Room code - the shareable 6-character room identifier
//!
//! Codes are 6 uppercase alphanumeric characters, unique across all rooms.
//! Lookup is case-insensitive: parsing normalizes to uppercase.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of characters in a room code
pub const CODE_LEN: usize = 6;

const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// A validated 6-character uppercase alphanumeric room code
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct RoomCode(String);

impl RoomCode {
    /// Generate a random room code
    ///
    /// Uniqueness is enforced at insert time by the caller (retry on
    /// collision against the unique index).
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let code: String = (0..CODE_LEN)
            .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
            .collect();
        Self(code)
    }

    /// Parse a code from client input, normalizing to uppercase
    pub fn parse(s: &str) -> Result<Self, RoomCodeParseError> {
        let trimmed = s.trim();
        if trimmed.len() != CODE_LEN {
            return Err(RoomCodeParseError::InvalidLength(trimmed.len()));
        }
        if !trimmed.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(RoomCodeParseError::InvalidCharacter);
        }
        Ok(Self(trimmed.to_ascii_uppercase()))
    }

    /// Get the code as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Error when parsing a room code from client input
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RoomCodeParseError {
    #[error("room code must be {CODE_LEN} characters, got {0}")]
    InvalidLength(usize),

    #[error("room code must be alphanumeric")]
    InvalidCharacter,
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for RoomCode {
    type Err = RoomCodeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RoomCode::parse(s)
    }
}

impl<'de> Deserialize<'de> for RoomCode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        RoomCode::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generate_shape() {
        for _ in 0..100 {
            let code = RoomCode::generate();
            assert_eq!(code.as_str().len(), CODE_LEN);
            assert!(code
                .as_str()
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
        }
    }

    #[test]
    fn test_generate_varies() {
        let codes: HashSet<String> = (0..100)
            .map(|_| RoomCode::generate().as_str().to_string())
            .collect();
        // 36^6 combinations; 100 draws colliding would be astronomically unlikely
        assert!(codes.len() > 90);
    }

    #[test]
    fn test_parse_case_insensitive() {
        let code = RoomCode::parse("abc123").unwrap();
        assert_eq!(code.as_str(), "ABC123");
        assert_eq!(code, RoomCode::parse("ABC123").unwrap());
    }

    #[test]
    fn test_parse_trims_whitespace() {
        let code = RoomCode::parse("  XY9Z01 ").unwrap();
        assert_eq!(code.as_str(), "XY9Z01");
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert_eq!(
            RoomCode::parse("ABC12").unwrap_err(),
            RoomCodeParseError::InvalidLength(5)
        );
        assert_eq!(
            RoomCode::parse("ABC1234").unwrap_err(),
            RoomCodeParseError::InvalidLength(7)
        );
        assert_eq!(
            RoomCode::parse("ABC-12").unwrap_err(),
            RoomCodeParseError::InvalidCharacter
        );
    }

    #[test]
    fn test_serde_round_trip() {
        let code = RoomCode::parse("QW3RT9").unwrap();
        let json = serde_json::to_string(&code).unwrap();
        assert_eq!(json, "\"QW3RT9\"");

        let parsed: RoomCode = serde_json::from_str("\"qw3rt9\"").unwrap();
        assert_eq!(parsed, code);
    }
}
