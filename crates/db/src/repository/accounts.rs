//! Account rows and the profile created alongside them.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    DbError,
    models::{AccountRow, NewAccount},
};

const ACCOUNT_COLUMNS: &str = "id, email, password_hash, password_salt, verification_code, \
     verification_expires_at, verified_at, waitlisted, created_at";

/// Insert an account and its profile in one transaction.
///
/// Returns `DbError::Conflict` if the email is already registered.
pub async fn create_account(pool: &PgPool, account: NewAccount) -> Result<AccountRow, DbError> {
    let id = Uuid::new_v4();
    let now = Utc::now();
    let mut tx = pool.begin().await?;

    let row = sqlx::query_as::<_, AccountRow>(&format!(
        r#"
        INSERT INTO accounts
            (id, email, password_hash, password_salt, verification_code,
             verification_expires_at, verified_at, waitlisted, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, NULL, $7, $8)
        RETURNING {ACCOUNT_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(&account.email)
    .bind(&account.password_hash)
    .bind(&account.password_salt)
    .bind(&account.verification_code)
    .bind(account.verification_expires_at)
    .bind(account.waitlisted)
    .bind(now)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| DbError::from_write(e, "account"))?;

    sqlx::query(
        r#"
        INSERT INTO profiles (id, first_name, last_name, postal_code, receive_requests, created_at, updated_at)
        VALUES ($1, $2, $3, $4, FALSE, $5, $5)
        "#,
    )
    .bind(id)
    .bind(&account.first_name)
    .bind(&account.last_name)
    .bind(&account.postal_code)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(row)
}

/// Fetch a single account by its primary key.
pub async fn get_account(pool: &PgPool, id: Uuid) -> Result<AccountRow, DbError> {
    sqlx::query_as::<_, AccountRow>(&format!(
        "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}

/// Look up an account by (already lower-cased) email.
pub async fn find_account_by_email(
    pool: &PgPool,
    email: &str,
) -> Result<Option<AccountRow>, DbError> {
    let row = sqlx::query_as::<_, AccountRow>(&format!(
        "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE email = $1"
    ))
    .bind(email)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Replace the pending verification code.
pub async fn set_verification_code(
    pool: &PgPool,
    id: Uuid,
    code: &str,
    expires_at: DateTime<Utc>,
) -> Result<(), DbError> {
    let result = sqlx::query(
        r#"
        UPDATE accounts
        SET verification_code = $1, verification_expires_at = $2
        WHERE id = $3
        "#,
    )
    .bind(code)
    .bind(expires_at)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}

/// Mark the account verified and drop the pending code.
pub async fn mark_verified(
    pool: &PgPool,
    id: Uuid,
    at: DateTime<Utc>,
) -> Result<AccountRow, DbError> {
    sqlx::query_as::<_, AccountRow>(&format!(
        r#"
        UPDATE accounts
        SET verified_at = $1, verification_code = NULL, verification_expires_at = NULL
        WHERE id = $2
        RETURNING {ACCOUNT_COLUMNS}
        "#
    ))
    .bind(at)
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}
