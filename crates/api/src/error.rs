//! HTTP error body and the mapping from service errors to status codes.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::error;

use matching::MatchingError;

/// Body of every error response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiError {
    /// Stable, machine-readable code such as `NOT_FOUND`.
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self { code: code.into(), message: message.into(), details: None }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// Error type returned by handlers.
#[derive(Debug)]
pub enum AppError {
    Service(MatchingError),
    BadRequest(String),
}

impl From<MatchingError> for AppError {
    fn from(err: MatchingError) -> Self {
        Self::Service(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, ApiError::new("BAD_REQUEST", message))
            }
            AppError::Service(err) => match err {
                MatchingError::Validation { field, message } => (
                    StatusCode::BAD_REQUEST,
                    ApiError::new("VALIDATION_ERROR", format!("{field}: {message}"))
                        .with_details(field),
                ),
                MatchingError::Unauthorized => (
                    StatusCode::UNAUTHORIZED,
                    ApiError::new("UNAUTHORIZED", "sign in to continue"),
                ),
                MatchingError::Forbidden(message) => {
                    (StatusCode::FORBIDDEN, ApiError::new("FORBIDDEN", message))
                }
                MatchingError::NotFound(what) => {
                    (StatusCode::NOT_FOUND, ApiError::new("NOT_FOUND", format!("{what} not found")))
                }
                MatchingError::Conflict(message) => {
                    (StatusCode::CONFLICT, ApiError::new("CONFLICT", message))
                }
                MatchingError::CapacityExhausted { timeslot_id } => (
                    StatusCode::CONFLICT,
                    ApiError::new("CAPACITY_EXHAUSTED", "this timeslot is fully booked")
                        .with_details(timeslot_id.to_string()),
                ),
                err @ (MatchingError::Notify(_) | MatchingError::Database(_)) => {
                    error!("request failed: {}", err);
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        ApiError::new("INTERNAL_ERROR", "something went wrong, please try again"),
                    )
                }
            },
        };
        (status, Json(body)).into_response()
    }
}
