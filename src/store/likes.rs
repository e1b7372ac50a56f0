//! Like rows
//!
//! The (user_id, product_id) pair is the primary key; duplicate likes from
//! the same user collapse to one row via ON CONFLICT DO NOTHING, so
//! parallel attempts need no locks.

use sqlx::PgPool;

use crate::errors::AppResult;

/// Record a like. Returns true when a new row was inserted, false when the
/// pair already existed.
pub async fn insert_ignore(pool: &PgPool, user_id: i64, product_id: i64) -> AppResult<bool> {
    let result = sqlx::query(
        r#"
        INSERT INTO likes (user_id, product_id)
        VALUES ($1, $2)
        ON CONFLICT (user_id, product_id) DO NOTHING
        "#,
    )
    .bind(user_id)
    .bind(product_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn count_for_product(pool: &PgPool, product_id: i64) -> AppResult<i64> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM likes WHERE product_id = $1",
    )
    .bind(product_id)
    .fetch_one(pool)
    .await?;

    Ok(count)
}
