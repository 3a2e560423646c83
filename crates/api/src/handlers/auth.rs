//! Sign-up, verification and sessions.

use std::convert::Infallible;

use axum::{
    extract::State,
    http::StatusCode,
    response::sse::{Event, Sse},
    Json,
};
use chrono::{DateTime, Utc};
use futures::Stream;
use serde::{Deserialize, Serialize};

use matching::{Registration, Session, SignUpOutcome};

use super::{sse, sse_event};
use crate::extract::CurrentUser;
use crate::{AppError, AppState};

#[derive(Deserialize)]
pub struct VerifyDto {
    pub email: String,
    pub code: String,
}

#[derive(Deserialize)]
pub struct EmailDto {
    pub email: String,
}

#[derive(Deserialize)]
pub struct SignInDto {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct ResendResponse {
    pub verification_expires_at: DateTime<Utc>,
}

/// POST /api/v1/auth/sign-up
pub async fn sign_up(
    State(state): State<AppState>,
    Json(form): Json<Registration>,
) -> Result<(StatusCode, Json<SignUpOutcome>), AppError> {
    let outcome = state.services.auth.sign_up(form).await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

/// POST /api/v1/auth/verify
pub async fn verify(
    State(state): State<AppState>,
    Json(body): Json<VerifyDto>,
) -> Result<Json<Session>, AppError> {
    Ok(Json(state.services.auth.verify(&body.email, &body.code).await?))
}

/// POST /api/v1/auth/resend
pub async fn resend(
    State(state): State<AppState>,
    Json(body): Json<EmailDto>,
) -> Result<Json<ResendResponse>, AppError> {
    let verification_expires_at = state.services.auth.resend_verification(&body.email).await?;
    Ok(Json(ResendResponse { verification_expires_at }))
}

/// POST /api/v1/auth/sign-in
pub async fn sign_in(
    State(state): State<AppState>,
    Json(body): Json<SignInDto>,
) -> Result<Json<Session>, AppError> {
    Ok(Json(state.services.auth.sign_in(&body.email, &body.password).await?))
}

/// GET /api/v1/auth/session
pub async fn session(CurrentUser(session): CurrentUser) -> Json<Session> {
    Json(session)
}

/// POST /api/v1/auth/sign-out
pub async fn sign_out(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
) -> Result<StatusCode, AppError> {
    state.services.auth.sign_out(&session).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/auth/events
///
/// The caller's sign-in, sign-out and profile updates, from any device.
pub async fn events(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let mut subscription = state.services.auth_events.subscribe(user.id());
    let stream = async_stream::stream! {
        while let Some(event) = subscription.recv().await {
            if let Some(event) = sse_event("auth", &event) {
                yield Ok(event);
            }
        }
    };
    sse(stream, state.keep_alive)
}
