//! Coupon templates and user-coupon rows
//!
//! The user-coupon save is an optimistic compare-and-swap on the version
//! column; zero rows affected means another transaction won the race.

use sqlx::{PgConnection, PgPool, Row};

use crate::domain::{Coupon, DiscountType, UserCoupon};
use crate::errors::{AppError, AppResult};

pub async fn find_coupon(conn: &mut PgConnection, code: &str) -> AppResult<Coupon> {
    let row = sqlx::query(
        r#"
        SELECT code, discount_type, value
        FROM coupons
        WHERE code = $1
        "#,
    )
    .bind(code)
    .fetch_optional(conn)
    .await?;

    let row = row.ok_or_else(|| AppError::not_found(format!("coupon not found: {code}")))?;

    let type_str: String = row.get("discount_type");
    let discount_type = DiscountType::from_str(&type_str)
        .ok_or_else(|| AppError::internal(format!("invalid discount type: {type_str}")))?;

    Ok(Coupon {
        code: row.get("code"),
        discount_type,
        value: row.get("value"),
    })
}

pub async fn find_user_coupon(
    conn: &mut PgConnection,
    user_id: i64,
    code: &str,
) -> AppResult<UserCoupon> {
    let row = sqlx::query(
        r#"
        SELECT user_id, coupon_code, used, version
        FROM user_coupons
        WHERE user_id = $1 AND coupon_code = $2
        "#,
    )
    .bind(user_id)
    .bind(code)
    .fetch_optional(conn)
    .await?;

    let row = row.ok_or_else(|| {
        AppError::not_found(format!("coupon not owned by user: {code}"))
    })?;

    Ok(UserCoupon {
        user_id: row.get("user_id"),
        coupon_code: row.get("coupon_code"),
        used: row.get("used"),
        version: row.get("version"),
    })
}

/// Mark a user coupon used iff the version still matches.
///
/// Returns false when another transaction already bumped the version.
pub async fn mark_used_cas(
    conn: &mut PgConnection,
    user_id: i64,
    code: &str,
    expected_version: i64,
) -> AppResult<bool> {
    let result = sqlx::query(
        r#"
        UPDATE user_coupons
        SET used = TRUE, version = version + 1
        WHERE user_id = $1 AND coupon_code = $2 AND used = FALSE AND version = $3
        "#,
    )
    .bind(user_id)
    .bind(code)
    .bind(expected_version)
    .execute(conn)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Insert a coupon template (seeding and tests).
pub async fn insert_coupon(
    pool: &PgPool,
    code: &str,
    discount_type: DiscountType,
    value: i64,
) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO coupons (code, discount_type, value)
        VALUES ($1, $2, $3)
        ON CONFLICT (code) DO NOTHING
        "#,
    )
    .bind(code)
    .bind(discount_type.as_str())
    .bind(value)
    .execute(pool)
    .await?;
    Ok(())
}

/// Grant a coupon to a user (seeding and tests).
pub async fn grant_user_coupon(pool: &PgPool, user_id: i64, code: &str) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO user_coupons (user_id, coupon_code)
        VALUES ($1, $2)
        ON CONFLICT (user_id, coupon_code) DO NOTHING
        "#,
    )
    .bind(user_id)
    .bind(code)
    .execute(pool)
    .await?;
    Ok(())
}
