//! Typed errors for the planner store.

use serde::Serialize;
use thiserror::Error;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors (4xx-like)
    MissingRequiredField,
    InvalidFieldValue,

    // Not found errors
    TaskNotFound,
    SubtaskNotFound,

    // Internal errors
    StorageError,
    InternalError,
}

/// Error type for all store operations.
///
/// `Validation` covers malformed input (duplicate ids in a reorder, empty
/// titles). `NotFound` covers ids that do not resolve within the caller's
/// ownership scope — a task belonging to another user is indistinguishable
/// from a missing one. `Storage` wraps the SQLite layer unchanged; the
/// store performs no retries.
#[derive(Debug, Error)]
pub enum Error {
    #[error("{message}")]
    Validation {
        code: ErrorCode,
        message: String,
        field: Option<String>,
    },

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("migration error: {0}")]
    Migration(#[from] refinery::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn missing_field(field: &str) -> Self {
        Error::Validation {
            code: ErrorCode::MissingRequiredField,
            message: format!("{} is required", field),
            field: Some(field.to_string()),
        }
    }

    pub fn invalid_value(field: &str, reason: impl Into<String>) -> Self {
        Error::Validation {
            code: ErrorCode::InvalidFieldValue,
            message: reason.into(),
            field: Some(field.to_string()),
        }
    }

    pub fn task_not_found(id: &str) -> Self {
        Error::NotFound {
            entity: "task",
            id: id.to_string(),
        }
    }

    pub fn subtask_not_found(id: &str) -> Self {
        Error::NotFound {
            entity: "subtask",
            id: id.to_string(),
        }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Error::Internal(msg.into())
    }

    /// The code a caller would map to a response status.
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::Validation { code, .. } => *code,
            Error::NotFound { entity, .. } => {
                if *entity == "subtask" {
                    ErrorCode::SubtaskNotFound
                } else {
                    ErrorCode::TaskNotFound
                }
            }
            Error::Storage(_) | Error::Migration(_) => ErrorCode::StorageError,
            Error::Internal(_) => ErrorCode::InternalError,
        }
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, Error>;
