//! Timeslot rows and their capacity counters.
//!
//! Counter changes go through [`lock_timeslot`] + [`set_spots_taken`] inside
//! a caller-owned transaction so `available` is always recomputed from the
//! locked row, never from a stale read.

use chrono::Utc;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::{
    DbError,
    models::{NewTimeslot, TimeslotFilter, TimeslotRow},
};

pub(crate) const TIMESLOT_COLUMNS: &str =
    "timeslot_id, location_id, date_time, capacity, spots_taken, available, created_at, updated_at";

pub async fn create_timeslot(pool: &PgPool, slot: NewTimeslot) -> Result<TimeslotRow, DbError> {
    let row = sqlx::query_as::<_, TimeslotRow>(&format!(
        r#"
        INSERT INTO timeslots
            (timeslot_id, location_id, date_time, capacity, spots_taken, available, created_at, updated_at)
        VALUES ($1, $2, $3, $4, 0, TRUE, $5, $5)
        RETURNING {TIMESLOT_COLUMNS}
        "#
    ))
    .bind(Uuid::new_v4())
    .bind(slot.location_id)
    .bind(slot.date_time)
    .bind(slot.capacity)
    .bind(Utc::now())
    .fetch_one(pool)
    .await?;
    Ok(row)
}

pub async fn get_timeslot(pool: &PgPool, id: Uuid) -> Result<TimeslotRow, DbError> {
    sqlx::query_as::<_, TimeslotRow>(&format!(
        "SELECT {TIMESLOT_COLUMNS} FROM timeslots WHERE timeslot_id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}

/// Timeslots matching every set condition of `filter`, earliest first.
pub async fn list_timeslots(
    pool: &PgPool,
    filter: &TimeslotFilter,
) -> Result<Vec<TimeslotRow>, DbError> {
    let rows = sqlx::query_as::<_, TimeslotRow>(&format!(
        r#"
        SELECT {TIMESLOT_COLUMNS} FROM timeslots
        WHERE ($1::timestamptz IS NULL OR date_time >= $1)
          AND ($2::timestamptz IS NULL OR date_time <= $2)
          AND ($3::uuid IS NULL OR location_id = $3)
          AND (NOT $4 OR available)
        ORDER BY date_time ASC
        "#
    ))
    .bind(filter.from)
    .bind(filter.to)
    .bind(filter.location_id)
    .bind(filter.available_only)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// `SELECT … FOR UPDATE` on one timeslot.  `None` if it does not exist.
pub async fn lock_timeslot(
    conn: &mut PgConnection,
    id: Uuid,
) -> Result<Option<TimeslotRow>, DbError> {
    let row = sqlx::query_as::<_, TimeslotRow>(&format!(
        "SELECT {TIMESLOT_COLUMNS} FROM timeslots WHERE timeslot_id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(row)
}

/// Write a new `spots_taken` and derive `available` from it.
pub async fn set_spots_taken(
    conn: &mut PgConnection,
    id: Uuid,
    spots_taken: i32,
) -> Result<TimeslotRow, DbError> {
    let row = sqlx::query_as::<_, TimeslotRow>(&format!(
        r#"
        UPDATE timeslots
        SET spots_taken = $1, available = ($1 < capacity), updated_at = $2
        WHERE timeslot_id = $3
        RETURNING {TIMESLOT_COLUMNS}
        "#
    ))
    .bind(spots_taken)
    .bind(Utc::now())
    .bind(id)
    .fetch_one(&mut *conn)
    .await?;
    Ok(row)
}
