use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use matching::chat::Conversation;

use crate::extract::CurrentUser;
use crate::{AppError, AppState};

#[derive(Deserialize)]
pub struct ChatQuery {
    #[serde(default)]
    pub q: Option<String>,
}

/// GET /api/v1/chats?q=
pub async fn list(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<ChatQuery>,
) -> Result<Json<Vec<Conversation>>, AppError> {
    Ok(Json(state.services.chat.conversations(user.id(), query.q).await?))
}
