//! Reservation engine
//!
//! Exclusive reads and writes of user point and product stock inside one
//! transaction. All writers acquire the user hold first and then the
//! product holds in ascending-id order; that global ordering is the only
//! deadlock-avoidance mechanism in the system, so every locking site goes
//! through these functions.

use std::collections::BTreeMap;

use sqlx::PgConnection;

use crate::domain::{Product, User};
use crate::errors::{AppError, AppResult};
use crate::store::{products, users};

/// Acquire the row-exclusive hold on the user. Must be called before any
/// product lock in the same transaction.
pub async fn lock_user_exclusive(
    conn: &mut PgConnection,
    external_user_id: &str,
) -> AppResult<User> {
    users::lock_by_external_id(conn, external_user_id).await
}

/// Acquire row-exclusive holds on all requested products.
///
/// Ids are sorted ascending and locked one by one in that order, also for
/// batches of one, so every caller takes locks in the same sequence.
/// Duplicate ids are rejected before any lock is taken.
pub async fn lock_products_exclusive(
    conn: &mut PgConnection,
    product_ids: &[i64],
) -> AppResult<BTreeMap<i64, Product>> {
    if product_ids.is_empty() {
        return Err(AppError::bad_request("no products requested"));
    }

    let mut sorted = product_ids.to_vec();
    sorted.sort_unstable();
    if sorted.windows(2).any(|w| w[0] == w[1]) {
        return Err(AppError::bad_request("duplicate product id in request"));
    }

    let mut locked = BTreeMap::new();
    for id in sorted {
        let product = products::lock_by_id(conn, id).await?;
        locked.insert(id, product);
    }
    Ok(locked)
}

/// Decrease a locked product's stock and persist the new level.
pub async fn decrease_stock(
    conn: &mut PgConnection,
    product: &mut Product,
    quantity: i64,
) -> AppResult<()> {
    product.decrease_stock(quantity)?;
    products::update_stock(conn, product.id, product.stock).await
}

/// Restore a locked product's stock (cancellation inverse).
pub async fn restore_stock(
    conn: &mut PgConnection,
    product: &mut Product,
    quantity: i64,
) -> AppResult<()> {
    product.restore_stock(quantity)?;
    products::update_stock(conn, product.id, product.stock).await
}

/// Deduct point from a locked user and persist the new balance.
pub async fn deduct_point(
    conn: &mut PgConnection,
    user: &mut User,
    amount: i64,
) -> AppResult<()> {
    user.deduct_point(amount)?;
    users::update_point(conn, user.id, user.point).await
}

/// Refund point to a locked user (cancellation inverse). A zero amount is
/// a no-op so point-free payments cancel cleanly.
pub async fn receive_point(
    conn: &mut PgConnection,
    user: &mut User,
    amount: i64,
) -> AppResult<()> {
    if amount == 0 {
        return Ok(());
    }
    user.receive_point(amount)?;
    users::update_point(conn, user.id, user.point).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_ids_detected_before_locking() {
        let mut ids = vec![3_i64, 1, 3];
        ids.sort_unstable();
        assert!(ids.windows(2).any(|w| w[0] == w[1]));

        let mut distinct = vec![3_i64, 1, 2];
        distinct.sort_unstable();
        assert!(!distinct.windows(2).any(|w| w[0] == w[1]));
    }

    #[test]
    fn test_sort_is_ascending() {
        let mut ids = vec![9_i64, 2, 5];
        ids.sort_unstable();
        assert_eq!(ids, vec![2, 5, 9]);
    }
}
