//! Repair request CRUD operations.

use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    DbError,
    models::{NewRepairRequest, RepairRequestRow, RepairStatus},
};

pub(crate) const REPAIR_COLUMNS: &str =
    "repair_id, user_id, product_id, description, status, created_at, updated_at";

pub async fn create_repair_request(
    pool: &PgPool,
    request: NewRepairRequest,
) -> Result<RepairRequestRow, DbError> {
    let created_at = request.created_at.unwrap_or_else(Utc::now);
    let row = sqlx::query_as::<_, RepairRequestRow>(&format!(
        r#"
        INSERT INTO repair_requests
            (repair_id, user_id, product_id, description, status, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $6)
        RETURNING {REPAIR_COLUMNS}
        "#
    ))
    .bind(Uuid::new_v4())
    .bind(request.user_id)
    .bind(request.product_id)
    .bind(&request.description)
    .bind(request.status.to_string())
    .bind(created_at)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

pub async fn get_repair_request(pool: &PgPool, id: Uuid) -> Result<RepairRequestRow, DbError> {
    sqlx::query_as::<_, RepairRequestRow>(&format!(
        "SELECT {REPAIR_COLUMNS} FROM repair_requests WHERE repair_id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}

pub async fn list_repair_requests_for_user(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<Vec<RepairRequestRow>, DbError> {
    let rows = sqlx::query_as::<_, RepairRequestRow>(&format!(
        "SELECT {REPAIR_COLUMNS} FROM repair_requests WHERE user_id = $1 ORDER BY created_at DESC"
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn list_repair_requests_by_status(
    pool: &PgPool,
    statuses: &[RepairStatus],
) -> Result<Vec<RepairRequestRow>, DbError> {
    let statuses: Vec<String> = statuses.iter().map(ToString::to_string).collect();
    let rows = sqlx::query_as::<_, RepairRequestRow>(&format!(
        "SELECT {REPAIR_COLUMNS} FROM repair_requests WHERE status = ANY($1) ORDER BY created_at DESC"
    ))
    .bind(statuses)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn list_repair_requests_by_ids(
    pool: &PgPool,
    ids: &[Uuid],
) -> Result<Vec<RepairRequestRow>, DbError> {
    let rows = sqlx::query_as::<_, RepairRequestRow>(&format!(
        "SELECT {REPAIR_COLUMNS} FROM repair_requests WHERE repair_id = ANY($1) ORDER BY created_at DESC"
    ))
    .bind(ids)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn update_repair_status(
    pool: &PgPool,
    id: Uuid,
    status: RepairStatus,
) -> Result<RepairRequestRow, DbError> {
    sqlx::query_as::<_, RepairRequestRow>(&format!(
        r#"
        UPDATE repair_requests SET status = $1, updated_at = $2
        WHERE repair_id = $3
        RETURNING {REPAIR_COLUMNS}
        "#
    ))
    .bind(status.to_string())
    .bind(Utc::now())
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}
