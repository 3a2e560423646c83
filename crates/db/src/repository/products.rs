//! Product CRUD operations.

use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    DbError,
    models::{NewProduct, ProductRow},
};

const PRODUCT_COLUMNS: &str = "product_id, user_id, type, brand, model, serial_number, doc_id, \
     status, created_at, updated_at";

pub async fn create_product(pool: &PgPool, product: NewProduct) -> Result<ProductRow, DbError> {
    let now = Utc::now();
    let row = sqlx::query_as::<_, ProductRow>(&format!(
        r#"
        INSERT INTO products
            (product_id, user_id, type, brand, model, serial_number, doc_id, status, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, NULL, $7, $8, $8)
        RETURNING {PRODUCT_COLUMNS}
        "#
    ))
    .bind(Uuid::new_v4())
    .bind(product.user_id)
    .bind(product.product_type.as_str())
    .bind(&product.brand)
    .bind(&product.model)
    .bind(&product.serial_number)
    .bind(product.status.to_string())
    .bind(now)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

pub async fn get_product(pool: &PgPool, id: Uuid) -> Result<ProductRow, DbError> {
    sqlx::query_as::<_, ProductRow>(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products WHERE product_id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}

/// Return the user's products ordered by creation time (newest first).
pub async fn list_products_for_user(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<Vec<ProductRow>, DbError> {
    let rows = sqlx::query_as::<_, ProductRow>(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products WHERE user_id = $1 ORDER BY created_at DESC"
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
