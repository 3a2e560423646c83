//! Profile reads and updates.  Profiles are created with their account.

use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    DbError,
    models::{ProfileRow, ProfileUpdate},
};

const PROFILE_COLUMNS: &str = "id, first_name, last_name, street, number, postal_code, city, \
     phone_number, receive_requests, created_at, updated_at";

pub async fn get_profile(pool: &PgPool, id: Uuid) -> Result<ProfileRow, DbError> {
    sqlx::query_as::<_, ProfileRow>(&format!(
        "SELECT {PROFILE_COLUMNS} FROM profiles WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}

pub async fn list_profiles(pool: &PgPool, ids: &[Uuid]) -> Result<Vec<ProfileRow>, DbError> {
    let rows = sqlx::query_as::<_, ProfileRow>(&format!(
        "SELECT {PROFILE_COLUMNS} FROM profiles WHERE id = ANY($1)"
    ))
    .bind(ids)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn update_profile(
    pool: &PgPool,
    id: Uuid,
    update: ProfileUpdate,
) -> Result<ProfileRow, DbError> {
    sqlx::query_as::<_, ProfileRow>(&format!(
        r#"
        UPDATE profiles
        SET first_name = $1, last_name = $2, street = $3, number = $4,
            postal_code = $5, city = $6, phone_number = $7,
            receive_requests = $8, updated_at = $9
        WHERE id = $10
        RETURNING {PROFILE_COLUMNS}
        "#
    ))
    .bind(&update.first_name)
    .bind(&update.last_name)
    .bind(&update.street)
    .bind(update.number)
    .bind(&update.postal_code)
    .bind(&update.city)
    .bind(&update.phone_number)
    .bind(update.receive_requests)
    .bind(Utc::now())
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}
