//! Error types for patient-intake.
//!
//! This module defines all error types used throughout the patient-intake crate,
//! providing detailed context for debugging and user-friendly error messages.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for patient-intake operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Storage Errors ===
    /// Failed to open or create the database.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A database query failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    /// Failed to run database migrations.
    #[error("database migration failed: {message}")]
    DatabaseMigration {
        /// Description of what went wrong.
        message: String,
    },

    /// A patient with this identifier is already registered.
    #[error("patient {patient_id} is already registered")]
    DuplicatePatient {
        /// The conflicting patient identifier.
        patient_id: String,
    },

    // === Password Policy Errors ===
    /// A validation rule failed its registration checks.
    #[error("invalid rule: {message}")]
    InvalidRule {
        /// Description of the problem, suitable for a 400 response.
        message: String,
    },

    /// A strong programmatic rule could not be evaluated.
    #[error("rule '{rule}' could not be evaluated: {message}")]
    RuleEvaluation {
        /// Name of the rule.
        rule: String,
        /// Description of what went wrong.
        message: String,
    },

    /// Hashing or verifying a password failed.
    #[error("password hashing failed: {0}")]
    PasswordHash(String),

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Generic Errors ===
    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for patient-intake operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl From<argon2::password_hash::Error> for Error {
    fn from(err: argon2::password_hash::Error) -> Self {
        Self::PasswordHash(err.to_string())
    }
}

impl From<argon2::Error> for Error {
    fn from(err: argon2::Error) -> Self {
        Self::PasswordHash(err.to_string())
    }
}

impl Error {
    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Create an invalid rule error.
    #[must_use]
    pub fn invalid_rule(message: impl Into<String>) -> Self {
        Self::InvalidRule {
            message: message.into(),
        }
    }

    /// Create a rule evaluation error.
    #[must_use]
    pub fn rule_evaluation(rule: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RuleEvaluation {
            rule: rule.into(),
            message: message.into(),
        }
    }

    /// Check if this error is a duplicate patient registration.
    #[must_use]
    pub fn is_duplicate_patient(&self) -> bool {
        matches!(self, Self::DuplicatePatient { .. })
    }

    /// Check if this error was caused by a rejected rule definition.
    #[must_use]
    pub fn is_invalid_rule(&self) -> bool {
        matches!(self, Self::InvalidRule { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::DuplicatePatient {
            patient_id: "P-001".to_string(),
        };
        assert_eq!(err.to_string(), "patient P-001 is already registered");

        let err = Error::internal("test error");
        assert_eq!(err.to_string(), "internal error: test error");
    }

    #[test]
    fn test_error_is_duplicate_patient() {
        let err = Error::DuplicatePatient {
            patient_id: "P-001".to_string(),
        };
        assert!(err.is_duplicate_patient());
        assert!(!Error::internal("test").is_duplicate_patient());
    }

    #[test]
    fn test_invalid_rule_error() {
        let err = Error::invalid_rule("Order number cannot be negative");
        assert!(err.is_invalid_rule());
        assert_eq!(
            err.to_string(),
            "invalid rule: Order number cannot be negative"
        );
    }

    #[test]
    fn test_rule_evaluation_error() {
        let err = Error::rule_evaluation("entropy", "unknown implementation reference");
        let msg = err.to_string();
        assert!(msg.contains("entropy"));
        assert!(msg.contains("unknown implementation reference"));
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_from_rusqlite_error() {
        let result = rusqlite::Connection::open_with_flags(
            "/nonexistent/path/db.sqlite",
            rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY,
        );
        if let Err(sqlite_err) = result {
            let err: Error = sqlite_err.into();
            assert!(matches!(err, Error::DatabaseQuery(_)));
        }
    }

    #[test]
    fn test_from_json_error() {
        let json_result: std::result::Result<i32, serde_json::Error> =
            serde_json::from_str("not valid json");
        if let Err(json_err) = json_result {
            let err: Error = json_err.into();
            assert!(matches!(err, Error::Json(_)));
        }
    }

    #[test]
    fn test_from_password_hash_error() {
        let err: Error = argon2::password_hash::Error::Password.into();
        assert!(matches!(err, Error::PasswordHash(_)));
    }

    #[test]
    fn test_database_migration_error_display() {
        let err = Error::DatabaseMigration {
            message: "version mismatch".to_string(),
        };
        assert!(err.to_string().contains("version mismatch"));
    }

    #[test]
    fn test_config_validation_error_display() {
        let err = Error::ConfigValidation {
            message: "invalid bind address".to_string(),
        };
        assert!(err.to_string().contains("invalid bind address"));
    }

    #[test]
    fn test_directory_create_error_display() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err = Error::DirectoryCreate {
            path: PathBuf::from("/root/forbidden"),
            source: io_err,
        };
        assert!(err.to_string().contains("/root/forbidden"));
    }
}
