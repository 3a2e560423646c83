//! Typed error type for the db crate.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("sqlx error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("row not found")]
    NotFound,

    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A uniqueness or state rule would be broken by the write.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The timeslot has no free spot left (or was closed).
    #[error("timeslot {timeslot_id} is at full capacity")]
    CapacityExhausted { timeslot_id: Uuid },
}

impl DbError {
    /// Map Postgres unique-violation errors onto [`DbError::Conflict`].
    pub(crate) fn from_write(err: sqlx::Error, what: &str) -> Self {
        if let sqlx::Error::Database(ref db_err) = err {
            if db_err.is_unique_violation() {
                return DbError::Conflict(format!("{what} already exists"));
            }
        }
        DbError::Sqlx(err)
    }
}
