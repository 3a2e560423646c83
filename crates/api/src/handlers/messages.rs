//! A repair request's message threads.

use std::convert::Infallible;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::sse::{Event, Sse},
    Json,
};
use futures::Stream;
use serde::Deserialize;
use uuid::Uuid;

use matching::chat::MessageView;
use matching::{SendMessage, Thread};

use super::{sse, sse_event};
use crate::extract::CurrentUser;
use crate::{AppError, AppState};

#[derive(Deserialize)]
pub struct ThreadQuery {
    #[serde(default)]
    pub thread: Thread,
}

/// GET /api/v1/repair-requests/:id/messages?thread=public|private
pub async fn history(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    Query(query): Query<ThreadQuery>,
) -> Result<Json<Vec<MessageView>>, AppError> {
    Ok(Json(state.services.chat.history(user.id(), id, query.thread).await?))
}

/// POST /api/v1/repair-requests/:id/messages
pub async fn send(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(body): Json<SendMessage>,
) -> Result<(StatusCode, Json<MessageView>), AppError> {
    let message = state.services.chat.send(user.id(), id, body).await?;
    Ok((StatusCode::CREATED, Json(message)))
}

/// GET /api/v1/repair-requests/:id/messages/stream?thread=public|private
pub async fn stream(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    Query(query): Query<ThreadQuery>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let mut subscription = state.services.chat.subscribe(user.id(), id, query.thread).await?;
    let stream = async_stream::stream! {
        while let Some(message) = subscription.next().await {
            if let Some(event) = sse_event("message", &message) {
                yield Ok(event);
            }
        }
    };
    Ok(sse(stream, state.keep_alive))
}
