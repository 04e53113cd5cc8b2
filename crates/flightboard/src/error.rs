//! Error types for flightboard.
//!
//! This module defines the error type shared by the storage, configuration,
//! data-source and table layers. Background polling tasks never surface these
//! to the board; they log them and wait for the next cycle.

use std::path::PathBuf;
use thiserror::Error;

use crate::fetch::Resource;

/// The main error type for flightboard operations.
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

    // === Data Source Errors ===
    /// Reading a text resource failed.
    #[error("failed to read {resource}: {message}")]
    Fetch {
        /// The resource being read.
        resource: Resource,
        /// Description of what went wrong.
        message: String,
    },

    /// The HTTP client failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    // === Table Errors ===
    /// The flight table file could not be parsed.
    #[error("failed to read flight table: {0}")]
    TableLoad(#[from] csv::Error),

    /// The flight table has no header row.
    #[error("flight table at {path} is empty")]
    EmptyTable {
        /// Path of the table file.
        path: PathBuf,
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

/// A specialized Result type for flightboard operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a new fetch error for the given resource.
    #[must_use]
    pub fn fetch(resource: Resource, message: impl Into<String>) -> Self {
        Self::Fetch {
            resource,
            message: message.into(),
        }
    }

    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Check if this error came from reading a data resource.
    #[must_use]
    pub fn is_fetch_error(&self) -> bool {
        matches!(self, Self::Fetch { .. } | Self::Http(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_display() {
        let err = Error::fetch(Resource::FlightStatus, "connection refused");
        let msg = err.to_string();
        assert!(msg.contains("FlightStatus.txt"));
        assert!(msg.contains("connection refused"));
    }

    #[test]
    fn test_is_fetch_error() {
        assert!(Error::fetch(Resource::EteText, "gone").is_fetch_error());
        assert!(!Error::internal("bug").is_fetch_error());
    }

    #[test]
    fn test_internal_error() {
        let err = Error::internal("something went wrong");
        assert_eq!(err.to_string(), "internal error: something went wrong");
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
    fn test_database_migration_error_display() {
        let err = Error::DatabaseMigration {
            message: "version mismatch".to_string(),
        };
        assert!(err.to_string().contains("version mismatch"));
    }

    #[test]
    fn test_config_validation_error_display() {
        let err = Error::ConfigValidation {
            message: "invalid interval".to_string(),
        };
        assert!(err.to_string().contains("invalid interval"));
    }

    #[test]
    fn test_empty_table_error_display() {
        let err = Error::EmptyTable {
            path: PathBuf::from("/tmp/flights.csv"),
        };
        assert!(err.to_string().contains("/tmp/flights.csv"));
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
