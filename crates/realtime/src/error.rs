//! Realtime error type.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RealtimeError {
    /// A record could not be turned into the JSON payload of an event.
    #[error("could not encode change record: {0}")]
    Encode(#[from] serde_json::Error),

    /// A `column=eq.value` filter string did not parse.
    #[error("invalid change filter: {0}")]
    InvalidFilter(String),
}
