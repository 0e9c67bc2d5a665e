//! Application-level error type.
//!
//! `DomainError` carries the interesting cases; the remaining variants
//! cover infrastructure and configuration failures that have no domain
//! meaning. Every error maps to a stable client-visible code and an
//! HTTP-style status class used to decide log severity.

use duo_core::DomainError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Internal server error")]
    Internal(#[source] anyhow::Error),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl AppError {
    /// HTTP-style status for this error.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_) => 400,
            Self::NotFound(_) => 404,
            Self::Conflict(_) => 409,
            Self::Database(_) | Self::Cache(_) | Self::Internal(_) | Self::Config(_) => 500,
            Self::Domain(e) => domain_status(e),
        }
    }

    /// Stable machine-readable code for client-visible payloads.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Conflict(_) => "CONFLICT",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Cache(_) => "CACHE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
            Self::Config(_) => "CONFIG_ERROR",
            Self::Domain(e) => e.code(),
        }
    }

    /// True for errors the client caused (4xx class).
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status_code())
    }
}

fn domain_status(e: &DomainError) -> u16 {
    match e {
        DomainError::RoomNotFound
        | DomainError::MessageNotFound(_)
        | DomainError::SessionNotFound(_) => 404,
        DomainError::UserNotInRoom => 403,
        DomainError::RoomFull | DomainError::RoomClosed | DomainError::DuplicateReaction => 409,
        DomainError::ValidationError(_) | DomainError::EmptyContent => 400,
        DomainError::RateLimitExceeded { .. } => 429,
        DomainError::DatabaseError(_) | DomainError::CacheError(_) | DomainError::InternalError(_) => {
            500
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infrastructure_errors_are_server_class() {
        assert_eq!(AppError::Database("down".to_string()).status_code(), 500);
        assert_eq!(AppError::Cache("down".to_string()).status_code(), 500);
        assert!(!AppError::Database("down".to_string()).is_client_error());
    }

    #[test]
    fn domain_errors_map_to_status() {
        assert_eq!(AppError::Domain(DomainError::RoomFull).status_code(), 409);
        assert_eq!(
            AppError::Domain(DomainError::UserNotInRoom).status_code(),
            403
        );
        assert_eq!(
            AppError::Domain(DomainError::RoomNotFound).status_code(),
            404
        );
        assert_eq!(
            AppError::Domain(DomainError::EmptyContent).status_code(),
            400
        );
        assert_eq!(
            AppError::Domain(DomainError::RateLimitExceeded {
                retry_after_secs: 3
            })
            .status_code(),
            429
        );
    }

    #[test]
    fn domain_codes_pass_through() {
        assert_eq!(
            AppError::Domain(DomainError::DuplicateReaction).error_code(),
            "DUPLICATE_REACTION"
        );
        assert_eq!(
            AppError::NotFound("room".to_string()).error_code(),
            "NOT_FOUND"
        );
    }

    #[test]
    fn client_errors_are_flagged() {
        assert!(AppError::NotFound("room".to_string()).is_client_error());
        assert!(AppError::Domain(DomainError::RoomFull).is_client_error());
    }
}
