use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};

use matching::ContactMessage;

use crate::{AppError, AppState};

/// POST /api/v1/contact
pub async fn submit(
    State(state): State<AppState>,
    Json(message): Json<ContactMessage>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    state.services.contact.submit(message).await?;
    Ok((StatusCode::ACCEPTED, Json(json!({ "message": "thanks, we will get back to you" }))))
}
