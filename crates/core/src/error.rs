// Central Error Type for the Application

use thiserror::Error;

/// Application-level error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Domain error: {0}")]
    Domain(#[from] crate::domain::DomainError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Optimistic version check lost a race; retry the whole operation from a fresh read.
    #[error("Concurrency conflict: {0}")]
    Conflict(String),

    /// A deferred job could not be persisted; the triggering transition was rolled back.
    #[error("Scheduling failure: {0}")]
    Scheduling(String),

    #[error("Collaborator error: {0}")]
    Collaborator(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// True when the caller should re-run the operation from a fresh read.
    pub fn is_conflict(&self) -> bool {
        matches!(self, AppError::Conflict(_))
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

// Note: sqlx::Error conversion is handled in infra-sqlite crate
// by converting to AppError::Database(String)
