//! Error types for the domain layer.

use std::collections::HashMap;
use std::error::Error;
use std::fmt;
use thiserror::Error;

/// Errors that occur during value object construction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Field '{field}' cannot be empty")]
    EmptyField { field: String },

    #[error("Field '{field}' must be between {min} and {max}, got {actual}")]
    OutOfRange {
        field: String,
        min: i64,
        max: i64,
        actual: i64,
    },

    #[error("Field '{field}' has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

impl ValidationError {
    /// Creates an empty field validation error.
    pub fn empty_field(field: impl Into<String>) -> Self {
        ValidationError::EmptyField { field: field.into() }
    }

    /// Creates an out of range validation error.
    pub fn out_of_range(field: impl Into<String>, min: i64, max: i64, actual: i64) -> Self {
        ValidationError::OutOfRange {
            field: field.into(),
            min,
            max,
            actual,
        }
    }

    /// Creates an invalid format validation error.
    pub fn invalid_format(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ValidationError::InvalidFormat {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Error codes organized by category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Validation errors
    ValidationFailed,
    InvalidStateTransition,

    // Lookup errors
    RecordNotFound,

    // Write guard errors
    Duplicate,
    Conflict,

    // Backing store absent or misconfigured
    SchemaMissing,
    AccessDenied,
    StoreMisconfigured,
    StoreUnreachable,

    // Infrastructure errors
    DatabaseError,
    Timeout,
    Cancelled,
    InternalError,
}

impl ErrorCode {
    /// Returns true for codes meaning the backing store itself is absent,
    /// unreachable, misconfigured, or simply does not hold the requested record.
    pub fn is_store_absent(&self) -> bool {
        matches!(
            self,
            ErrorCode::SchemaMissing
                | ErrorCode::AccessDenied
                | ErrorCode::StoreMisconfigured
                | ErrorCode::StoreUnreachable
                | ErrorCode::RecordNotFound
        )
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorCode::ValidationFailed => "VALIDATION_FAILED",
            ErrorCode::InvalidStateTransition => "INVALID_STATE_TRANSITION",
            ErrorCode::RecordNotFound => "RECORD_NOT_FOUND",
            ErrorCode::Duplicate => "DUPLICATE",
            ErrorCode::Conflict => "CONFLICT",
            ErrorCode::SchemaMissing => "SCHEMA_MISSING",
            ErrorCode::AccessDenied => "ACCESS_DENIED",
            ErrorCode::StoreMisconfigured => "STORE_MISCONFIGURED",
            ErrorCode::StoreUnreachable => "STORE_UNREACHABLE",
            ErrorCode::DatabaseError => "DATABASE_ERROR",
            ErrorCode::Timeout => "TIMEOUT",
            ErrorCode::Cancelled => "CANCELLED",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        };
        write!(f, "{}", s)
    }
}

/// Standard domain error with code, message, and optional details.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainError {
    pub code: ErrorCode,
    pub message: String,
    pub details: HashMap<String, String>,
}

impl DomainError {
    /// Creates a new domain error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: HashMap::new(),
        }
    }

    /// Creates a validation error for a specific field.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ValidationFailed, message).with_detail("field", field.into())
    }

    /// Creates a not-found error for a record of the given kind.
    pub fn not_found(kind: &str, id: impl fmt::Display) -> Self {
        Self::new(ErrorCode::RecordNotFound, format!("{} not found: {}", kind, id))
            .with_detail("kind", kind)
    }

    /// Adds a detail to the error.
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }

    /// True when the error says the store is absent or misconfigured
    /// rather than that the operation itself was rejected.
    pub fn is_store_absent(&self) -> bool {
        self.code.is_store_absent()
    }

    /// True when a write was rejected by a uniqueness or overlap guard.
    pub fn is_write_conflict(&self) -> bool {
        matches!(self.code, ErrorCode::Duplicate | ErrorCode::Conflict)
    }
}

impl fmt::Display for DomainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl Error for DomainError {}

impl From<ValidationError> for DomainError {
    fn from(err: ValidationError) -> Self {
        DomainError::new(ErrorCode::ValidationFailed, err.to_string())
    }
}
