//! Service layer errors.

use duo_common::AppError;
use duo_core::DomainError;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Domain rule violation, passed through unchanged.
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("{resource} not found: {id}")]
    NotFound { resource: &'static str, id: String },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl ServiceError {
    pub fn not_found(resource: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            resource,
            id: id.into(),
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Stable code surfaced to clients.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Domain(e) => e.code(),
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Conflict(_) => "CONFLICT",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether the client can recover by changing its request.
    pub fn is_client_recoverable(&self) -> bool {
        match self {
            Self::Domain(e) => e.is_client_recoverable(),
            Self::NotFound { .. } | Self::Validation(_) | Self::Conflict(_) => true,
            Self::Internal(_) => false,
        }
    }

    /// Seconds the client should wait before retrying, for rate limits.
    pub fn retry_after(&self) -> Option<u64> {
        match self {
            Self::Domain(DomainError::RateLimitExceeded { retry_after_secs }) => {
                Some(*retry_after_secs)
            }
            _ => None,
        }
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Domain(e) => AppError::Domain(e),
            ServiceError::NotFound { resource, id } => {
                AppError::NotFound(format!("{resource} {id}"))
            }
            ServiceError::Validation(msg) => AppError::Validation(msg),
            ServiceError::Conflict(msg) => AppError::Conflict(msg),
            ServiceError::Internal(msg) => AppError::Internal(anyhow::anyhow!(msg)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_formats_resource_and_id() {
        let err = ServiceError::not_found("Room", "123");
        assert_eq!(err.error_code(), "NOT_FOUND");
        assert_eq!(err.to_string(), "Room not found: 123");
        assert!(err.is_client_recoverable());
    }

    #[test]
    fn domain_codes_pass_through() {
        let err = ServiceError::from(DomainError::RoomFull);
        assert_eq!(err.error_code(), "ROOM_FULL");
        assert!(err.is_client_recoverable());
    }

    #[test]
    fn retry_after_only_for_rate_limits() {
        let err = ServiceError::from(DomainError::RateLimitExceeded { retry_after_secs: 7 });
        assert_eq!(err.retry_after(), Some(7));
        assert_eq!(ServiceError::validation("x").retry_after(), None);
    }

    #[test]
    fn internal_errors_are_not_recoverable() {
        assert!(!ServiceError::internal("boom").is_client_recoverable());
    }

    #[test]
    fn converts_to_app_error_with_status() {
        let app_err: AppError = ServiceError::not_found("Room", "456").into();
        assert_eq!(app_err.status_code(), 404);
    }
}
