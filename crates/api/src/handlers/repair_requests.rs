//! Repair requests and the timeslot holds attached to them.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use db::models::{RepairRequestRow, RepairStatus, RepairTimeslotRow, TimeslotRow};
use matching::booking::{Confirmation, RepairerTimeslots};
use matching::requests::{BrowseQuery, RepairRequestInput, RequestQuery};
use matching::views::RepairRequestView;

use crate::extract::CurrentUser;
use crate::{AppError, AppState};

#[derive(Deserialize)]
pub struct StatusDto {
    pub status: RepairStatus,
}

#[derive(Deserialize)]
pub struct SelectionDto {
    pub timeslot_ids: Vec<Uuid>,
}

/// POST /api/v1/repair-requests
pub async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(input): Json<RepairRequestInput>,
) -> Result<(StatusCode, Json<RepairRequestView>), AppError> {
    let view = state.services.requests.create_repair_request(user.id(), input).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// GET /api/v1/repair-requests?tab=&q=
pub async fn list_own(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<RequestQuery>,
) -> Result<Json<Vec<RepairRequestView>>, AppError> {
    Ok(Json(state.services.requests.list_own_requests(user.id(), query).await?))
}

/// GET /api/v1/repair-requests/browse?status=&device_type=&q=
pub async fn browse(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<BrowseQuery>,
) -> Result<Json<Vec<RepairRequestView>>, AppError> {
    Ok(Json(state.services.requests.browse_requests(user.id(), query).await?))
}

/// GET /api/v1/repair-requests/:id
pub async fn get(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<RepairRequestView>, AppError> {
    Ok(Json(state.services.requests.get_request_details(user.id(), id).await?))
}

/// PUT /api/v1/repair-requests/:id/status
pub async fn update_status(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(body): Json<StatusDto>,
) -> Result<Json<RepairRequestRow>, AppError> {
    Ok(Json(state.services.requests.update_status(user.id(), id, body.status).await?))
}

/// POST /api/v1/repair-requests/:id/timeslots
pub async fn submit_timeslots(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(body): Json<SelectionDto>,
) -> Result<(StatusCode, Json<Vec<RepairTimeslotRow>>), AppError> {
    let holds = state
        .services
        .booking
        .submit_selection(user.id(), id, &body.timeslot_ids)
        .await?;
    Ok((StatusCode::CREATED, Json(holds)))
}

/// DELETE /api/v1/repair-requests/:id/timeslots/:timeslot_id
pub async fn withdraw_timeslot(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((id, timeslot_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<TimeslotRow>, AppError> {
    Ok(Json(state.services.booking.withdraw(user.id(), id, timeslot_id).await?))
}

/// GET /api/v1/repair-requests/:id/available-timeslots
pub async fn available_timeslots(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<RepairerTimeslots>, AppError> {
    Ok(Json(state.services.booking.repair_timeslots_for_repairer(user.id(), id).await?))
}

/// POST /api/v1/repair-requests/:id/timeslots/:timeslot_id/confirm
pub async fn confirm_timeslot(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((id, timeslot_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Confirmation>, AppError> {
    Ok(Json(state.services.booking.confirm(user.id(), id, timeslot_id).await?))
}
