//! Holds and confirmations linking repair requests to timeslots.
//!
//! Booking, confirmation and cancellation each run in one transaction with
//! row locks, so two requesters can never push a timeslot past its capacity
//! and a repair can never end up with two confirmed slots.
//!
//! Lock order is always the repair request row first, then timeslot rows by
//! ascending id.

use chrono::Utc;
use sqlx::{PgConnection, PgPool};
use tracing::debug;
use uuid::Uuid;

use super::{
    repair_requests::REPAIR_COLUMNS,
    timeslots::{lock_timeslot, set_spots_taken},
};
use crate::{
    DbError,
    models::{
        AvailableTimeslotRow, BookingOutcome, CancellationOutcome, ConfirmationOutcome,
        RepairRequestRow, RepairStatus, RepairTimeslotRow, TimeslotRow,
    },
};

const HOLD_COLUMNS: &str = "id, repair_id, timeslot_id, is_confirmed, created_at, updated_at";

pub async fn list_repair_timeslots(
    pool: &PgPool,
    repair_id: Uuid,
) -> Result<Vec<RepairTimeslotRow>, DbError> {
    let rows = sqlx::query_as::<_, RepairTimeslotRow>(&format!(
        "SELECT {HOLD_COLUMNS} FROM repair_timeslots WHERE repair_id = $1 ORDER BY created_at ASC"
    ))
    .bind(repair_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Hold every timeslot in `timeslot_ids` for `repair_id`, all or nothing.
///
/// Timeslots are locked in id order so concurrent bookings that overlap
/// cannot deadlock.
pub async fn book_timeslots(
    pool: &PgPool,
    repair_id: Uuid,
    timeslot_ids: &[Uuid],
) -> Result<BookingOutcome, DbError> {
    let mut ordered = timeslot_ids.to_vec();
    ordered.sort();

    let mut tx = pool.begin().await?;
    // FOR SHARE lets bookings of the same repair run side by side while
    // keeping a cancellation or confirmation out until commit.
    let status = lock_request_status(&mut tx, repair_id, "FOR SHARE").await?;
    if !status.is_open() {
        return Err(DbError::Conflict(format!(
            "timeslots cannot be held for a {status} request"
        )));
    }

    let mut holds = Vec::with_capacity(ordered.len());
    let mut timeslots = Vec::with_capacity(ordered.len());

    for timeslot_id in ordered {
        let slot = lock_timeslot(&mut tx, timeslot_id)
            .await?
            .ok_or(DbError::NotFound)?;

        if find_hold(&mut tx, repair_id, timeslot_id).await?.is_some() {
            return Err(DbError::Conflict(format!(
                "timeslot {timeslot_id} is already held for this repair"
            )));
        }
        if !slot.available || slot.is_full() {
            return Err(DbError::CapacityExhausted { timeslot_id });
        }

        let hold = sqlx::query_as::<_, RepairTimeslotRow>(&format!(
            r#"
            INSERT INTO repair_timeslots (id, repair_id, timeslot_id, is_confirmed, created_at, updated_at)
            VALUES ($1, $2, $3, FALSE, $4, $4)
            RETURNING {HOLD_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(repair_id)
        .bind(timeslot_id)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| DbError::from_write(e, "timeslot hold"))?;

        let updated = set_spots_taken(&mut tx, timeslot_id, slot.spots_taken + 1).await?;
        debug!(
            "held timeslot {} for repair {} ({}/{})",
            timeslot_id, repair_id, updated.spots_taken, updated.capacity
        );
        holds.push(hold);
        timeslots.push(updated);
    }

    tx.commit().await?;
    Ok(BookingOutcome { holds, timeslots })
}

/// Give back an unconfirmed hold and free its spot.
pub async fn release_timeslot(
    pool: &PgPool,
    repair_id: Uuid,
    timeslot_id: Uuid,
) -> Result<TimeslotRow, DbError> {
    let mut tx = pool.begin().await?;

    let hold = find_hold(&mut tx, repair_id, timeslot_id)
        .await?
        .ok_or(DbError::NotFound)?;
    if hold.is_confirmed {
        return Err(DbError::Conflict("a confirmed timeslot cannot be released".into()));
    }

    let slot = free_hold(&mut tx, &hold).await?;
    tx.commit().await?;
    Ok(slot)
}

/// Confirm `timeslot_id` for `repair_id`, release the other holds, and mark
/// the request `scheduled`.
pub async fn confirm_timeslot(
    pool: &PgPool,
    repair_id: Uuid,
    timeslot_id: Uuid,
) -> Result<ConfirmationOutcome, DbError> {
    let mut tx = pool.begin().await?;

    // Serialises confirmations and cancellations of the same repair.  NO KEY
    // UPDATE leaves the foreign-key share locks of other writes unblocked.
    let status = lock_request_status(&mut tx, repair_id, "FOR NO KEY UPDATE").await?;
    if !status.is_open() {
        return Err(DbError::Conflict(format!("a {status} request cannot be scheduled")));
    }

    let holds = lock_holds(&mut tx, repair_id).await?;
    if holds.iter().any(|h| h.is_confirmed) {
        return Err(DbError::Conflict("this repair already has a confirmed timeslot".into()));
    }
    if !holds.iter().any(|h| h.timeslot_id == timeslot_id) {
        return Err(DbError::NotFound);
    }

    // Take every timeslot lock before writing anything.
    let mut timeslot = None;
    for hold in &holds {
        let slot = lock_timeslot(&mut tx, hold.timeslot_id)
            .await?
            .ok_or(DbError::NotFound)?;
        if slot.timeslot_id == timeslot_id {
            timeslot = Some(slot);
        }
    }
    let timeslot = timeslot.ok_or(DbError::NotFound)?;

    let confirmed = sqlx::query_as::<_, RepairTimeslotRow>(&format!(
        r#"
        UPDATE repair_timeslots SET is_confirmed = TRUE, updated_at = $1
        WHERE repair_id = $2 AND timeslot_id = $3
        RETURNING {HOLD_COLUMNS}
        "#
    ))
    .bind(Utc::now())
    .bind(repair_id)
    .bind(timeslot_id)
    .fetch_one(&mut *tx)
    .await?;

    let mut released = Vec::new();
    for hold in holds.iter().filter(|h| h.timeslot_id != timeslot_id) {
        released.push(free_hold(&mut tx, hold).await?);
    }

    let request = set_request_status(&mut tx, repair_id, RepairStatus::Scheduled).await?;

    tx.commit().await?;
    Ok(ConfirmationOutcome { confirmed, request, timeslot, released })
}

/// Cancel the request and give back all of its holds.
pub async fn cancel_repair_request(
    pool: &PgPool,
    repair_id: Uuid,
) -> Result<CancellationOutcome, DbError> {
    let mut tx = pool.begin().await?;

    let status = lock_request_status(&mut tx, repair_id, "FOR NO KEY UPDATE").await?;
    if status.is_closed() {
        return Err(DbError::Conflict(format!("a {status} request cannot be cancelled")));
    }

    // Holds come back ordered by timeslot id, so freeing them in turn keeps
    // the lock order.
    let holds = lock_holds(&mut tx, repair_id).await?;
    let mut released = Vec::with_capacity(holds.len());
    for hold in &holds {
        released.push(free_hold(&mut tx, hold).await?);
    }

    let request = set_request_status(&mut tx, repair_id, RepairStatus::Cancelled).await?;
    tx.commit().await?;
    debug!("cancelled repair {} and released {} holds", repair_id, released.len());
    Ok(CancellationOutcome { request, released })
}

/// The unconfirmed holds of a repair, joined with their location.
pub async fn available_repair_timeslots(
    pool: &PgPool,
    repair_id: Uuid,
) -> Result<Vec<AvailableTimeslotRow>, DbError> {
    let rows = sqlx::query_as::<_, AvailableTimeslotRow>(
        r#"
        SELECT t.timeslot_id, t.date_time, t.location_id, l.name AS location_name,
               t.available AS is_available, t.capacity, t.spots_taken,
               (t.capacity - t.spots_taken) AS spots_available
        FROM repair_timeslots rt
        JOIN timeslots t ON t.timeslot_id = rt.timeslot_id
        JOIN locations l ON l.location_id = t.location_id
        WHERE rt.repair_id = $1 AND NOT rt.is_confirmed
        ORDER BY t.date_time ASC
        "#,
    )
    .bind(repair_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

// ---------------------------------------------------------------------------
// Transaction helpers
// ---------------------------------------------------------------------------

/// Lock the request row and read its status.
async fn lock_request_status(
    conn: &mut PgConnection,
    repair_id: Uuid,
    lock: &str,
) -> Result<RepairStatus, DbError> {
    let status: String = sqlx::query_scalar(&format!(
        "SELECT status FROM repair_requests WHERE repair_id = $1 {lock}"
    ))
    .bind(repair_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or(DbError::NotFound)?;
    status.parse().map_err(DbError::Conflict)
}

async fn set_request_status(
    conn: &mut PgConnection,
    repair_id: Uuid,
    status: RepairStatus,
) -> Result<RepairRequestRow, DbError> {
    let row = sqlx::query_as::<_, RepairRequestRow>(&format!(
        r#"
        UPDATE repair_requests SET status = $1, updated_at = $2
        WHERE repair_id = $3
        RETURNING {REPAIR_COLUMNS}
        "#
    ))
    .bind(status.to_string())
    .bind(Utc::now())
    .bind(repair_id)
    .fetch_one(&mut *conn)
    .await?;
    Ok(row)
}

/// All holds of a repair, locked, by timeslot id.
async fn lock_holds(
    conn: &mut PgConnection,
    repair_id: Uuid,
) -> Result<Vec<RepairTimeslotRow>, DbError> {
    let rows = sqlx::query_as::<_, RepairTimeslotRow>(&format!(
        "SELECT {HOLD_COLUMNS} FROM repair_timeslots WHERE repair_id = $1 ORDER BY timeslot_id FOR UPDATE"
    ))
    .bind(repair_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows)
}

async fn find_hold(
    conn: &mut PgConnection,
    repair_id: Uuid,
    timeslot_id: Uuid,
) -> Result<Option<RepairTimeslotRow>, DbError> {
    let row = sqlx::query_as::<_, RepairTimeslotRow>(&format!(
        "SELECT {HOLD_COLUMNS} FROM repair_timeslots WHERE repair_id = $1 AND timeslot_id = $2 FOR UPDATE"
    ))
    .bind(repair_id)
    .bind(timeslot_id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(row)
}

/// Delete a hold and decrement its timeslot's counter.
async fn free_hold(
    conn: &mut PgConnection,
    hold: &RepairTimeslotRow,
) -> Result<TimeslotRow, DbError> {
    sqlx::query("DELETE FROM repair_timeslots WHERE id = $1")
        .bind(hold.id)
        .execute(&mut *conn)
        .await?;

    let slot = lock_timeslot(conn, hold.timeslot_id)
        .await?
        .ok_or(DbError::NotFound)?;
    set_spots_taken(conn, slot.timeslot_id, (slot.spots_taken - 1).max(0)).await
}
