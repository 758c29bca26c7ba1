//! Error types for entikit

use thiserror::Error;

/// Result type alias using entikit's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Raised when a versioned write finds the row changed or gone since it was read
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("row {key} in '{table}' is no longer at version {expected}")]
pub struct StaleRow {
    pub table: &'static str,
    pub key: i64,
    pub expected: i64,
}

/// entikit error types with helpful messages and suggestions
#[derive(Error, Debug)]
pub enum Error {
    // Criteria errors (E100-E199)
    #[error("Invalid criteria: {0}")]
    InvalidCriteria(String),

    #[error("Operation cancelled")]
    Cancelled,

    // Write errors (E200-E299)
    #[error("Duplicate key for '{entity}': {source}")]
    DuplicateKey {
        entity: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("Row version conflict for '{entity}': {source}")]
    ConcurrencyConflict {
        entity: String,
        #[source]
        source: StaleRow,
    },

    #[error("Entity '{0}' not found")]
    EntityNotFound(String),

    #[error("Entity '{0}' has no key; insert it before updating or deleting")]
    MissingKey(String),

    // Context errors (E300-E399)
    #[error("No database context registered for entity '{0}'")]
    ContextNotFound(String),

    // Database errors (E400-E499)
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    // Config errors (E600-E699)
    #[error("Configuration error: {0}")]
    ConfigError(String),

    // Generic errors
    #[error("{0}")]
    Other(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Get error code for this error type
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidCriteria(_) => "E100",
            Self::Cancelled => "E101",
            Self::DuplicateKey { .. } => "E200",
            Self::ConcurrencyConflict { .. } => "E201",
            Self::EntityNotFound(_) => "E202",
            Self::MissingKey(_) => "E203",
            Self::ContextNotFound(_) => "E300",
            Self::DatabaseError(_) => "E400",
            Self::ConfigError(_) => "E600",
            Self::Other(_) | Self::Io(_) => "E9999",
        }
    }

    /// Get suggestion for how to fix this error
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Self::DuplicateKey { .. } => {
                Some("Change the conflicting value and submit again".to_string())
            }
            Self::ConcurrencyConflict { .. } => {
                Some("Reload the record, reapply your changes and submit again".to_string())
            }
            Self::ContextNotFound(entity) => Some(format!(
                "Register a database for '{}' or set a default context",
                entity
            )),
            Self::ConfigError(_) => Some("entikit config show".to_string()),
            _ => None,
        }
    }

    /// Whether the failure is resolved by the user refreshing and resubmitting,
    /// as opposed to a transient infrastructure fault.
    pub fn is_user_retryable(&self) -> bool {
        matches!(
            self,
            Self::DuplicateKey { .. } | Self::ConcurrencyConflict { .. }
        )
    }
}
