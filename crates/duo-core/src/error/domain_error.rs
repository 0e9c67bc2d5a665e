//! Domain errors - error types for the domain layer
//!
//! All variants are recoverable by the client: they carry a stable code and
//! a message, and never crash a connection.

use thiserror::Error;

use crate::value_objects::Snowflake;

/// Domain layer errors
#[derive(Debug, Error)]
pub enum DomainError {
    // =========================================================================
    // Not Found Errors
    // =========================================================================
    #[error("Room not found")]
    RoomNotFound,

    #[error("Message not found: {0}")]
    MessageNotFound(Snowflake),

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    // =========================================================================
    // Room Rule Violations
    // =========================================================================
    #[error("Room is full")]
    RoomFull,

    #[error("Room is closed")]
    RoomClosed,

    #[error("User is not a participant of this room")]
    UserNotInRoom,

    // =========================================================================
    // Conflict Errors
    // =========================================================================
    #[error("Reaction already exists")]
    DuplicateReaction,

    // =========================================================================
    // Validation Errors
    // =========================================================================
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Message content is empty")]
    EmptyContent,

    // =========================================================================
    // Rate Limiting
    // =========================================================================
    #[error("Rate limit exceeded, retry in {retry_after_secs}s")]
    RateLimitExceeded { retry_after_secs: u64 },

    // =========================================================================
    // Infrastructure Errors (wrapped)
    // =========================================================================
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Cache error: {0}")]
    CacheError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl DomainError {
    /// Get a stable error code string for client-visible responses
    pub fn code(&self) -> &'static str {
        match self {
            Self::RoomNotFound => "ROOM_NOT_FOUND",
            Self::MessageNotFound(_) => "MESSAGE_NOT_FOUND",
            Self::SessionNotFound(_) => "SESSION_NOT_FOUND",
            Self::RoomFull => "ROOM_FULL",
            Self::RoomClosed => "ROOM_CLOSED",
            Self::UserNotInRoom => "USER_NOT_IN_ROOM",
            Self::DuplicateReaction => "DUPLICATE_REACTION",
            Self::ValidationError(_) => "VALIDATION_ERROR",
            Self::EmptyContent => "EMPTY_CONTENT",
            Self::RateLimitExceeded { .. } => "RATE_LIMIT",
            Self::DatabaseError(_) => "DATABASE_ERROR",
            Self::CacheError(_) => "CACHE_ERROR",
            Self::InternalError(_) => "INTERNAL_ERROR",
        }
    }

    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::RoomNotFound | Self::MessageNotFound(_) | Self::SessionNotFound(_)
        )
    }

    /// Check if this error is recoverable by the client (vs. infrastructure)
    pub fn is_client_recoverable(&self) -> bool {
        !matches!(
            self,
            Self::DatabaseError(_) | Self::CacheError(_) | Self::InternalError(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(DomainError::RoomFull.code(), "ROOM_FULL");
        assert_eq!(DomainError::RoomClosed.code(), "ROOM_CLOSED");
        assert_eq!(DomainError::DuplicateReaction.code(), "DUPLICATE_REACTION");
        assert_eq!(
            DomainError::RateLimitExceeded { retry_after_secs: 5 }.code(),
            "RATE_LIMIT"
        );
    }

    #[test]
    fn test_is_not_found() {
        assert!(DomainError::RoomNotFound.is_not_found());
        assert!(DomainError::MessageNotFound(Snowflake::new(1)).is_not_found());
        assert!(!DomainError::RoomFull.is_not_found());
    }

    #[test]
    fn test_recoverability() {
        assert!(DomainError::UserNotInRoom.is_client_recoverable());
        assert!(!DomainError::DatabaseError("boom".to_string()).is_client_recoverable());
    }
}
