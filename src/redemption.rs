//! Coupon redemption
//!
//! At most one coupon per order, used exactly once globally. The coupon
//! row is never locked pessimistically; parallel redeemers race on the
//! version compare-and-swap and the loser surfaces a client-visible 409.

use sqlx::PgConnection;

use crate::errors::{AppError, AppResult};
use crate::store::coupons;

/// Redeem `code` for `user_id` against `subtotal`; returns the discount.
pub async fn redeem(
    conn: &mut PgConnection,
    user_id: i64,
    code: &str,
    subtotal: i64,
) -> AppResult<i64> {
    let coupon = coupons::find_coupon(conn, code).await?;
    let mut user_coupon = coupons::find_user_coupon(conn, user_id, code).await?;

    // Fast-path rejection; the racing case is caught by the CAS below.
    user_coupon.mark_used()?;

    let discount = coupon.discount_for(subtotal)?;

    let swapped =
        coupons::mark_used_cas(conn, user_id, code, user_coupon.version).await?;
    if !swapped {
        return Err(AppError::conflict(format!("coupon already used: {code}")));
    }

    tracing::debug!(user_id, coupon = %code, discount, "coupon redeemed");
    Ok(discount)
}
