//! Handler error types

use crate::protocol::ServerEvent;
use duo_core::DomainError;
use duo_service::ServiceError;
use thiserror::Error;

/// Handler error type
#[derive(Debug, Error)]
pub enum HandlerError {
    /// The socket is not subscribed to the room it is acting on
    #[error("Not in room")]
    NotInRoom,

    /// Domain rule violation
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    /// Service layer error
    #[error("Service error: {0}")]
    Service(#[from] ServiceError),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl HandlerError {
    /// Stable code surfaced to the client
    pub fn code(&self) -> &str {
        match self {
            Self::NotInRoom => "NOT_IN_ROOM",
            Self::Domain(e) => e.code(),
            Self::Service(e) => e.error_code(),
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Seconds the client should wait, for rate-limit rejections
    pub fn retry_after(&self) -> Option<u64> {
        match self {
            Self::Domain(DomainError::RateLimitExceeded { retry_after_secs }) => {
                Some(*retry_after_secs)
            }
            Self::Service(e) => e.retry_after(),
            _ => None,
        }
    }

    /// Whether the client can recover by changing its request
    pub fn is_client_recoverable(&self) -> bool {
        match self {
            Self::NotInRoom => true,
            Self::Domain(e) => e.is_client_recoverable(),
            Self::Service(e) => e.is_client_recoverable(),
            Self::Internal(_) => false,
        }
    }

    /// Map to the client-visible `error` event
    ///
    /// Internal details stay in the logs; the client only ever sees a
    /// stable code and a safe message.
    pub fn to_event(&self) -> ServerEvent {
        let message = if self.is_client_recoverable() {
            self.to_string()
        } else {
            "Internal server error".to_string()
        };

        ServerEvent::error(message, Some(self.code().to_string()), self.retry_after())
    }
}

/// Handler result type
pub type HandlerResult<T> = Result<T, HandlerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limit_error_carries_retry_after() {
        let err = HandlerError::from(DomainError::RateLimitExceeded { retry_after_secs: 9 });
        assert_eq!(err.code(), "RATE_LIMIT");
        assert_eq!(err.retry_after(), Some(9));

        match err.to_event() {
            ServerEvent::Error {
                code, retry_after, ..
            } => {
                assert_eq!(code.as_deref(), Some("RATE_LIMIT"));
                assert_eq!(retry_after, Some(9));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_internal_errors_are_masked() {
        let err = HandlerError::Internal("pool exhausted at 10.0.0.3".to_string());
        match err.to_event() {
            ServerEvent::Error { message, code, .. } => {
                assert_eq!(message, "Internal server error");
                assert_eq!(code.as_deref(), Some("INTERNAL_ERROR"));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_domain_errors_pass_their_code() {
        let err = HandlerError::from(DomainError::RoomFull);
        assert_eq!(err.code(), "ROOM_FULL");
        assert!(err.is_client_recoverable());
    }
}
