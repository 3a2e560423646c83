//! Repair locations (community centres, repair cafés).

use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    DbError,
    models::{LocationRow, NewLocation},
};

const LOCATION_COLUMNS: &str =
    "location_id, name, address, description, google_maps_link, created_at, updated_at";

pub async fn create_location(pool: &PgPool, location: NewLocation) -> Result<LocationRow, DbError> {
    let row = sqlx::query_as::<_, LocationRow>(&format!(
        r#"
        INSERT INTO locations
            (location_id, name, address, description, google_maps_link, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $6)
        RETURNING {LOCATION_COLUMNS}
        "#
    ))
    .bind(Uuid::new_v4())
    .bind(&location.name)
    .bind(&location.address)
    .bind(&location.description)
    .bind(&location.google_maps_link)
    .bind(Utc::now())
    .fetch_one(pool)
    .await?;
    Ok(row)
}

pub async fn get_location(pool: &PgPool, id: Uuid) -> Result<LocationRow, DbError> {
    sqlx::query_as::<_, LocationRow>(&format!(
        "SELECT {LOCATION_COLUMNS} FROM locations WHERE location_id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}

pub async fn list_locations(pool: &PgPool) -> Result<Vec<LocationRow>, DbError> {
    let rows = sqlx::query_as::<_, LocationRow>(&format!(
        "SELECT {LOCATION_COLUMNS} FROM locations ORDER BY name ASC"
    ))
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
