//! Unified error types for the ordering engine.
//!
//! Every operation returns [`Result`]. Callers at the HTTP boundary should use
//! [`Error::kind`] to pick a response class and [`Error::public_message`] for
//! the text shown to diners, which never leaks store internals.

use sea_orm::DbErr;
use thiserror::Error;

/// All failures the engine can report.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration could not be read, parsed or validated
    #[error("Configuration error: {message}")]
    Config {
        /// What was wrong with the configuration
        message: String,
    },

    /// Missing or malformed input
    #[error("Invalid input: {message}")]
    Validation {
        /// Which input was rejected and why
        message: String,
    },

    /// A session, cart, item, order, table or user does not exist
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Kind of record that was looked up
        entity: &'static str,
        /// Identifier that was looked up
        id: String,
    },

    /// The request is well-formed but not allowed in the current state
    #[error("Conflict: {message}")]
    Conflict {
        /// Which state rule was violated
        message: String,
    },

    /// Store I/O failure
    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    /// A multi-step write committed some steps and failed others.
    ///
    /// Retrying the whole operation would duplicate the committed part, so the
    /// caller must reconcile instead.
    #[error("Partial failure in {operation}: committed {committed}; failed {failed}")]
    PartialFailure {
        /// Operation that was interrupted
        operation: &'static str,
        /// What is durable in the store
        committed: String,
        /// What did not happen
        failed: String,
    },

    /// An operation exceeded its deadline
    #[error("{operation} timed out after {timeout_ms}ms")]
    Timeout {
        /// Operation that timed out
        operation: &'static str,
        /// Configured deadline
        timeout_ms: u64,
    },

    /// JSON (de)serialization of stored blobs failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// The error classes exposed to callers of the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing/malformed input
    Validation,
    /// Absent record
    NotFound,
    /// Invalid state or transition
    Conflict,
    /// Store or infrastructure failure
    Persistence,
    /// Some writes committed, others did not
    PartialFailure,
}

impl Error {
    /// Classifies the error into one of the caller-facing kinds.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } => ErrorKind::Validation,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Conflict { .. } => ErrorKind::Conflict,
            Self::PartialFailure { .. } => ErrorKind::PartialFailure,
            Self::Config { .. } | Self::Database(_) | Self::Timeout { .. } | Self::Json(_) => {
                ErrorKind::Persistence
            }
        }
    }

    /// Message safe to show to a diner.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self.kind() {
            ErrorKind::Validation | ErrorKind::NotFound | ErrorKind::Conflict => self.to_string(),
            ErrorKind::Persistence => "Something went wrong, please try again".to_string(),
            ErrorKind::PartialFailure => {
                "Your request was only partly processed, please ask the staff for help".to_string()
            }
        }
    }

    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub(crate) fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    pub(crate) fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
