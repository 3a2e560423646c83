//! Locations and open timeslots.  Readable without signing in.

use std::convert::Infallible;

use axum::{
    extract::{Query, State},
    response::sse::{Event, Sse},
    Json,
};
use chrono::NaiveDate;
use futures::Stream;
use serde::Deserialize;
use uuid::Uuid;

use db::models::LocationRow;
use matching::booking::TimeslotView;
use realtime::ChangeFilter;

use super::{sse, sse_event};
use crate::{AppError, AppState};

#[derive(Deserialize)]
pub struct LocationQuery {
    #[serde(default)]
    pub location_id: Option<Uuid>,
}

#[derive(Deserialize)]
pub struct DayQuery {
    pub date: NaiveDate,
    #[serde(default)]
    pub location_id: Option<Uuid>,
}

/// GET /api/v1/locations
pub async fn locations(State(state): State<AppState>) -> Result<Json<Vec<LocationRow>>, AppError> {
    Ok(Json(state.services.booking.locations().await?))
}

/// GET /api/v1/timeslots/dates?location_id=
pub async fn dates(
    State(state): State<AppState>,
    Query(query): Query<LocationQuery>,
) -> Result<Json<Vec<NaiveDate>>, AppError> {
    Ok(Json(state.services.booking.available_dates(query.location_id).await?))
}

/// GET /api/v1/timeslots?date=YYYY-MM-DD&location_id=
pub async fn for_day(
    State(state): State<AppState>,
    Query(query): Query<DayQuery>,
) -> Result<Json<Vec<TimeslotView>>, AppError> {
    Ok(Json(
        state.services.booking.timeslots_for_day(query.date, query.location_id).await?,
    ))
}

/// GET /api/v1/timeslots/stream?location_id=
///
/// Every change to a timeslot's capacity or availability.
pub async fn stream(
    State(state): State<AppState>,
    Query(query): Query<LocationQuery>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let filter = match query.location_id {
        Some(id) => ChangeFilter::table("timeslots").eq("location_id", id),
        None => ChangeFilter::table("timeslots"),
    };
    let mut subscription = state.services.changes.subscribe(filter);
    let stream = async_stream::stream! {
        while let Some(change) = subscription.recv().await {
            if let Some(event) = sse_event("timeslot", &change) {
                yield Ok(event);
            }
        }
    };
    sse(stream, state.keep_alive)
}
