//! Domain-level error types.

use std::fmt;

use thiserror::Error;

/// Why a validation check rejected a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationReason {
    /// Post title or content is empty after trimming.
    EmptyField,
    /// Image content type is neither `image/jpeg` nor `image/png`.
    BadImageType,
    EmptyUsername,
    EmptyPassword,
}

impl ValidationReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationReason::EmptyField => "empty-field",
            ValidationReason::BadImageType => "bad-image-type",
            ValidationReason::EmptyUsername => "empty-username",
            ValidationReason::EmptyPassword => "empty-password",
        }
    }
}

impl fmt::Display for ValidationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Domain errors - business logic failures.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Entity not found: {entity_type} {key}")]
    NotFound {
        entity_type: &'static str,
        key: String,
    },

    #[error("Validation failed: {reason}")]
    ValidationFailed { reason: ValidationReason },

    #[error("Payload too large: {size} bytes exceeds the {limit} byte limit")]
    PayloadTooLarge { size: u64, limit: u64 },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized access")]
    Unauthorized,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DomainError {
    pub fn not_found(entity_type: &'static str, key: impl fmt::Display) -> Self {
        DomainError::NotFound {
            entity_type,
            key: key.to_string(),
        }
    }

    pub fn invalid(reason: ValidationReason) -> Self {
        DomainError::ValidationFailed { reason }
    }
}

/// Repository-level errors.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Database connection failed: {0}")]
    Connection(String),

    #[error("Query execution failed: {0}")]
    Query(String),

    #[error("Constraint violation: {0}")]
    Constraint(String),
}

/// File storage errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid file name: {0}")]
    InvalidName(String),

    #[error("Storage I/O failed: {0}")]
    Io(String),
}

impl From<RepoError> for DomainError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::Constraint(msg) => DomainError::Conflict(msg),
            RepoError::Connection(msg) | RepoError::Query(msg) => DomainError::Internal(msg),
        }
    }
}

impl From<StorageError> for DomainError {
    fn from(err: StorageError) -> Self {
        DomainError::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_reason_renders_kebab_case() {
        let err = DomainError::invalid(ValidationReason::BadImageType);
        assert_eq!(err.to_string(), "Validation failed: bad-image-type");
    }

    #[test]
    fn test_constraint_violation_becomes_conflict() {
        let err: DomainError = RepoError::Constraint("username taken".to_string()).into();
        assert!(matches!(err, DomainError::Conflict(msg) if msg == "username taken"));
    }
}
