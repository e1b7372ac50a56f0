//! User rows: exclusive locking and point persistence

use sqlx::postgres::PgRow;
use sqlx::{PgConnection, PgPool, Row};

use crate::domain::User;
use crate::errors::{AppError, AppResult};

fn row_to_user(row: &PgRow) -> User {
    User {
        id: row.get("id"),
        external_id: row.get("external_id"),
        email: row.get("email"),
        birth_date: row.get("birth_date"),
        gender: row.get("gender"),
        point: row.get("point"),
    }
}

/// Acquire a row-exclusive hold on the user keyed by the external id.
///
/// The hold is released at commit/rollback of the enclosing transaction.
pub async fn lock_by_external_id(conn: &mut PgConnection, external_id: &str) -> AppResult<User> {
    let row = sqlx::query(
        r#"
        SELECT id, external_id, email, birth_date, gender, point
        FROM users
        WHERE external_id = $1
        FOR UPDATE
        "#,
    )
    .bind(external_id)
    .fetch_optional(conn)
    .await?;

    row.map(|r| row_to_user(&r))
        .ok_or_else(|| AppError::not_found(format!("user not found: {external_id}")))
}

/// Plain read by external id (list/read paths, no lock).
pub async fn find_by_external_id(pool: &PgPool, external_id: &str) -> AppResult<User> {
    let row = sqlx::query(
        r#"
        SELECT id, external_id, email, birth_date, gender, point
        FROM users
        WHERE external_id = $1
        "#,
    )
    .bind(external_id)
    .fetch_optional(pool)
    .await?;

    row.map(|r| row_to_user(&r))
        .ok_or_else(|| AppError::not_found(format!("user not found: {external_id}")))
}

/// Acquire a row-exclusive hold by internal id (cancellation path, where
/// the order row already carries the user id).
pub async fn lock_by_id(conn: &mut PgConnection, user_id: i64) -> AppResult<User> {
    let row = sqlx::query(
        r#"
        SELECT id, external_id, email, birth_date, gender, point
        FROM users
        WHERE id = $1
        FOR UPDATE
        "#,
    )
    .bind(user_id)
    .fetch_optional(conn)
    .await?;

    row.map(|r| row_to_user(&r))
        .ok_or_else(|| AppError::not_found(format!("user not found: id={user_id}")))
}

/// External id for a user (gateway wire calls key on it).
pub async fn external_id_of(pool: &PgPool, user_id: i64) -> AppResult<String> {
    let external_id = sqlx::query_scalar::<_, String>(
        "SELECT external_id FROM users WHERE id = $1",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    external_id.ok_or_else(|| AppError::not_found(format!("user not found: id={user_id}")))
}

/// Persist a new point balance for a user row the caller holds a lock on.
pub async fn update_point(conn: &mut PgConnection, user_id: i64, point: i64) -> AppResult<()> {
    let result = sqlx::query("UPDATE users SET point = $1 WHERE id = $2")
        .bind(point)
        .bind(user_id)
        .execute(conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found(format!("user not found: id={user_id}")));
    }
    Ok(())
}

/// Insert a user (seeding and tests).
pub async fn insert(
    pool: &PgPool,
    external_id: &str,
    email: &str,
    point: i64,
) -> AppResult<i64> {
    let id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO users (external_id, email, point)
        VALUES ($1, $2, $3)
        RETURNING id
        "#,
    )
    .bind(external_id)
    .bind(email)
    .bind(point)
    .fetch_one(pool)
    .await?;

    Ok(id)
}
