// Domain Error Types

use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    #[error("Invalid shift state transition: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Actor {actor} does not own shift {shift_id}")]
    NotOwner { shift_id: String, actor: String },

    #[error("Shift {0} is not active")]
    Inactive(String),

    #[error("Shift {shift_id} is not assigned to {actor}")]
    NotAssigned { shift_id: String, actor: String },

    #[error("Shift {0} already accepted")]
    AlreadyAccepted(String),

    #[error("Shift {0} already started")]
    AlreadyStarted(String),

    #[error("Shift {shift_id} cannot be clocked in before {earliest}")]
    TooEarly {
        shift_id: String,
        earliest: DateTime<Utc>,
    },

    #[error("Shift {0} has not started")]
    NotStarted(String),

    #[error("Shift {0} already confirmed")]
    AlreadyConfirmed(String),

    #[error("Shift {0} is not completed")]
    NotCompleted(String),

    #[error("Not allowed: {0}")]
    NotAllowed(String),
}

impl DomainError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        DomainError::NotFound {
            entity,
            id: id.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, DomainError>;
