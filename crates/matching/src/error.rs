//! Service-level error type.

use thiserror::Error;
use uuid::Uuid;

use db::DbError;

use crate::notifier::NotifyError;

/// Errors returned by every service in this crate.
///
/// The HTTP layer maps each variant onto a status code, so variants are
/// chosen by what the caller did wrong, not by where the failure happened.
#[derive(Debug, Error)]
pub enum MatchingError {
    /// Input failed a validation rule.
    #[error("{field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    /// Missing, unknown or expired credentials.
    #[error("not authenticated")]
    Unauthorized,

    /// Authenticated, but not allowed to do this.
    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    /// The request clashes with current state (duplicate, wrong lifecycle step).
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("timeslot {timeslot_id} is fully booked")]
    CapacityExhausted { timeslot_id: Uuid },

    #[error("notification failed: {0}")]
    Notify(#[from] NotifyError),

    #[error("database error: {0}")]
    Database(DbError),
}

impl MatchingError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation { field, message: message.into() }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }
}

impl From<DbError> for MatchingError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound => Self::NotFound("record"),
            DbError::Conflict(message) => Self::Conflict(message),
            DbError::CapacityExhausted { timeslot_id } => Self::CapacityExhausted { timeslot_id },
            other => Self::Database(other),
        }
    }
}

/// Convert a store error, naming the missing thing on `NotFound`.
pub(crate) fn or_missing(what: &'static str) -> impl FnOnce(DbError) -> MatchingError {
    move |err| match err {
        DbError::NotFound => MatchingError::NotFound(what),
        other => other.into(),
    }
}
