use axum::{extract::State, Json};

use db::models::ProductRow;
use matching::requests::{ProfileInput, ProfileView};

use crate::extract::CurrentUser;
use crate::{AppError, AppState};

/// GET /api/v1/profile
pub async fn get_profile(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<ProfileView>, AppError> {
    Ok(Json(state.services.requests.get_profile(user.id()).await?))
}

/// PUT /api/v1/profile
pub async fn update_profile(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(input): Json<ProfileInput>,
) -> Result<Json<ProfileView>, AppError> {
    Ok(Json(state.services.requests.update_profile(user.id(), input).await?))
}

/// GET /api/v1/products
pub async fn list_products(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<ProductRow>>, AppError> {
    Ok(Json(state.services.requests.list_products(user.id()).await?))
}
