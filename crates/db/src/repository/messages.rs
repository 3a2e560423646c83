//! Chat messages attached to repair requests.

use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    DbError,
    models::{MessageRow, NewMessage, ThreadFilter},
};

const MESSAGE_COLUMNS: &str =
    "message_id, repair_id, sender_id, recipient_id, is_public, content, created_at";

pub async fn create_message(pool: &PgPool, message: NewMessage) -> Result<MessageRow, DbError> {
    let row = sqlx::query_as::<_, MessageRow>(&format!(
        r#"
        INSERT INTO messages (message_id, repair_id, sender_id, recipient_id, is_public, content, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING {MESSAGE_COLUMNS}
        "#
    ))
    .bind(Uuid::new_v4())
    .bind(message.repair_id)
    .bind(message.sender_id)
    .bind(message.recipient_id)
    .bind(message.is_public)
    .bind(&message.content)
    .bind(Utc::now())
    .fetch_one(pool)
    .await?;
    Ok(row)
}

/// One thread of a repair's conversation, oldest first.
pub async fn list_messages(
    pool: &PgPool,
    repair_id: Uuid,
    thread: ThreadFilter,
) -> Result<Vec<MessageRow>, DbError> {
    let rows = match thread {
        ThreadFilter::Public => {
            sqlx::query_as::<_, MessageRow>(&format!(
                r#"
                SELECT {MESSAGE_COLUMNS} FROM messages
                WHERE repair_id = $1 AND is_public
                ORDER BY created_at ASC
                "#
            ))
            .bind(repair_id)
            .fetch_all(pool)
            .await?
        }
        ThreadFilter::PrivateFor(user_id) => {
            sqlx::query_as::<_, MessageRow>(&format!(
                r#"
                SELECT {MESSAGE_COLUMNS} FROM messages
                WHERE repair_id = $1 AND NOT is_public
                  AND (sender_id = $2 OR recipient_id = $2)
                ORDER BY created_at ASC
                "#
            ))
            .bind(repair_id)
            .bind(user_id)
            .fetch_all(pool)
            .await?
        }
    };
    Ok(rows)
}

pub async fn latest_private_message(
    pool: &PgPool,
    repair_id: Uuid,
    user_id: Uuid,
) -> Result<Option<MessageRow>, DbError> {
    let row = sqlx::query_as::<_, MessageRow>(&format!(
        r#"
        SELECT {MESSAGE_COLUMNS} FROM messages
        WHERE repair_id = $1 AND NOT is_public
          AND (sender_id = $2 OR recipient_id = $2)
        ORDER BY created_at DESC
        LIMIT 1
        "#
    ))
    .bind(repair_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

pub async fn repairs_with_private_messages(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<Vec<Uuid>, DbError> {
    let ids = sqlx::query_scalar::<_, Uuid>(
        r#"
        SELECT DISTINCT repair_id FROM messages
        WHERE NOT is_public AND (sender_id = $1 OR recipient_id = $1)
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(ids)
}
