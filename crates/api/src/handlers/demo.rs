use axum::{extract::State, http::StatusCode, Json};

use matching::views::RepairRequestView;

use crate::extract::CurrentUser;
use crate::{AppError, AppState};

/// POST /api/v1/demo
pub async fn populate(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<(StatusCode, Json<Vec<RepairRequestView>>), AppError> {
    let added = state.services.demo.populate(user.id()).await?;
    Ok((StatusCode::CREATED, Json(added)))
}
