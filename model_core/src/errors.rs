//! # Error Types
//!
//! Two families of errors live here:
//!
//! - [`ModelError`] is returned by fallible infrastructure calls (reading a
//!   document from disk, loading settings, extracting a typed value out of a
//!   materialized instance). It is an ordinary `Result` error.
//! - [`FailureKind`] classifies the *non-fatal* problems found while
//!   materializing a document. These never escape `materialize`; they are
//!   reported through the diagnostics stream instead.
//!
//! ## Example
//!
//! ```rust
//! use model_core::errors::{ModelError, ModelResult};
//!
//! fn require_name(name: &str) -> ModelResult<()> {
//!     if name.is_empty() {
//!         return Err(ModelError::missing_field("Name"));
//!     }
//!     Ok(())
//! }
//! # assert!(require_name("").is_err());
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for model_core operations
pub type ModelResult<T> = Result<T, ModelError>;

/// Structured error type for infrastructure and typed-extraction failures.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "details")]
pub enum ModelError {
    /// A materialized value does not have the shape a typed extraction expects
    #[error("Expected {expected} for '{field}', found {found}")]
    UnexpectedInstance {
        field: String,
        expected: String,
        found: String,
    },

    /// A required field is missing from a materialized object
    #[error("Missing required field: {field}")]
    MissingField { field: String },

    /// The document could only be captured generically
    #[error("Document for '{type_tag}' was captured instead of reconstructed ({field_count} fields preserved)")]
    Captured { type_tag: String, field_count: usize },

    /// A type name is not known to the catalog
    #[error("Type not found: {name}")]
    TypeNotFound { name: String },

    /// The type catalog returned inconsistent data
    #[error("Catalog error: {reason}")]
    Catalog { reason: String },

    /// File I/O error
    #[error("File error: {operation} on '{path}' - {reason}")]
    FileError {
        operation: String,
        path: String,
        reason: String,
    },

    /// JSON serialization/deserialization error
    #[error("Serialization error: {reason}")]
    SerializationError { reason: String },

    /// Generic internal error (should be rare)
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl ModelError {
    /// Create an UnexpectedInstance error
    pub fn unexpected(field: impl Into<String>, expected: impl Into<String>, found: impl Into<String>) -> Self {
        ModelError::UnexpectedInstance {
            field: field.into(),
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// Create a MissingField error
    pub fn missing_field(field: impl Into<String>) -> Self {
        ModelError::MissingField { field: field.into() }
    }

    /// Create a TypeNotFound error
    pub fn type_not_found(name: impl Into<String>) -> Self {
        ModelError::TypeNotFound { name: name.into() }
    }

    /// Create a Catalog error
    pub fn catalog(reason: impl Into<String>) -> Self {
        ModelError::Catalog { reason: reason.into() }
    }

    /// Create a FileError
    pub fn file_error(operation: impl Into<String>, path: impl Into<String>, reason: impl Into<String>) -> Self {
        ModelError::FileError {
            operation: operation.into(),
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Get a short error code for programmatic handling
    pub fn error_code(&self) -> &'static str {
        match self {
            ModelError::UnexpectedInstance { .. } => "UNEXPECTED_INSTANCE",
            ModelError::MissingField { .. } => "MISSING_FIELD",
            ModelError::Captured { .. } => "CAPTURED",
            ModelError::TypeNotFound { .. } => "TYPE_NOT_FOUND",
            ModelError::Catalog { .. } => "CATALOG_ERROR",
            ModelError::FileError { .. } => "FILE_ERROR",
            ModelError::SerializationError { .. } => "SERIALIZATION_ERROR",
            ModelError::Internal { .. } => "INTERNAL_ERROR",
        }
    }
}

impl From<serde_json::Error> for ModelError {
    fn from(e: serde_json::Error) -> Self {
        ModelError::SerializationError { reason: e.to_string() }
    }
}

/// Classification of a non-fatal materialization problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureKind {
    /// Node kind differs from what the target category requires
    ShapeMismatch,
    /// A type name could not be resolved
    TypeResolutionFailure,
    /// Constructor parameters could not be matched one-to-one with document fields
    ConstructorMatchFailure,
    /// The type rejected its arguments or cannot be instantiated at all
    ConstructionFailure,
    /// A document field has no target member and no extension slot
    PropertyMissing,
    /// A materialized value is not assignable to its member or parameter
    PropertyTypeMismatch,
    /// A document field targets a member that cannot be written
    ReadOnlyProperty,
    /// Migration returned nothing or an unchanged document
    MigrationNoOp,
    /// An already-migrated document failed again
    MigrationLoopGuardTripped,
    /// Document nesting exceeded the configured depth
    DepthLimitExceeded,
    /// A method reference could not be resolved
    MethodResolutionFailure,
}

impl FailureKind {
    /// Short code for programmatic handling
    pub fn code(&self) -> &'static str {
        match self {
            FailureKind::ShapeMismatch => "SHAPE_MISMATCH",
            FailureKind::TypeResolutionFailure => "TYPE_RESOLUTION_FAILURE",
            FailureKind::ConstructorMatchFailure => "CONSTRUCTOR_MATCH_FAILURE",
            FailureKind::ConstructionFailure => "CONSTRUCTION_FAILURE",
            FailureKind::PropertyMissing => "PROPERTY_MISSING",
            FailureKind::PropertyTypeMismatch => "PROPERTY_TYPE_MISMATCH",
            FailureKind::ReadOnlyProperty => "READ_ONLY_PROPERTY",
            FailureKind::MigrationNoOp => "MIGRATION_NO_OP",
            FailureKind::MigrationLoopGuardTripped => "MIGRATION_LOOP_GUARD_TRIPPED",
            FailureKind::DepthLimitExceeded => "DEPTH_LIMIT_EXCEEDED",
            FailureKind::MethodResolutionFailure => "METHOD_RESOLUTION_FAILURE",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// A classified materialization failure, carried internally by every codec
/// until it is reported or escalated.
#[derive(Debug, Clone, PartialEq)]
pub struct Failure {
    pub kind: FailureKind,
    pub message: String,
}

impl Failure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Failure {
            kind,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Failure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_serialization() {
        let error = ModelError::unexpected("X", "Double", "String");
        let json = serde_json::to_string(&error).unwrap();
        let roundtrip: ModelError = serde_json::from_str(&json).unwrap();
        assert_eq!(error, roundtrip);
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(ModelError::missing_field("Z").error_code(), "MISSING_FIELD");
        assert_eq!(ModelError::type_not_found("Point").error_code(), "TYPE_NOT_FOUND");
        assert_eq!(FailureKind::MigrationNoOp.code(), "MIGRATION_NO_OP");
    }

    #[test]
    fn test_json_error_conversion() {
        let err: ModelError = serde_json::from_str::<serde_json::Value>("{").unwrap_err().into();
        assert_eq!(err.error_code(), "SERIALIZATION_ERROR");
    }
}
