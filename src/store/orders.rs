//! Order rows
//!
//! Items are stored inline as JSONB on the order row. Status changes go
//! through an atomic CAS so terminal states stay absorbing under races.

use sqlx::postgres::PgRow;
use sqlx::{PgConnection, PgPool, Row};

use crate::domain::{Order, OrderItem, OrderStatus};
use crate::errors::{AppError, AppResult};

pub struct NewOrder<'a> {
    pub user_id: i64,
    pub total_amount: i64,
    pub items: &'a [OrderItem],
    pub coupon_code: Option<&'a str>,
    pub discount_amount: i64,
}

fn row_to_order(row: &PgRow) -> AppResult<Order> {
    let status_str: String = row.get("status");
    let status = OrderStatus::from_str(&status_str)
        .ok_or_else(|| AppError::internal(format!("invalid order status: {status_str}")))?;

    let items_json: serde_json::Value = row.get("items");
    let items: Vec<OrderItem> = serde_json::from_value(items_json)?;

    Ok(Order {
        id: row.get("id"),
        user_id: row.get("user_id"),
        status,
        total_amount: row.get("total_amount"),
        items,
        coupon_code: row.get("coupon_code"),
        discount_amount: row.get("discount_amount"),
        created_at: row.get("created_at"),
    })
}

const SELECT_ORDER: &str = r#"
SELECT id, user_id, status, total_amount, items, coupon_code, discount_amount, created_at
FROM orders
"#;

/// Insert a PENDING order and return it with its generated id.
pub async fn insert(conn: &mut PgConnection, new: NewOrder<'_>) -> AppResult<Order> {
    let items_json = serde_json::to_value(new.items)?;

    let row = sqlx::query(
        r#"
        INSERT INTO orders (user_id, status, total_amount, items, coupon_code, discount_amount)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id, user_id, status, total_amount, items, coupon_code, discount_amount, created_at
        "#,
    )
    .bind(new.user_id)
    .bind(OrderStatus::Pending.as_str())
    .bind(new.total_amount)
    .bind(items_json)
    .bind(new.coupon_code)
    .bind(new.discount_amount)
    .fetch_one(conn)
    .await?;

    row_to_order(&row)
}

/// Atomic CAS: move the order from `expected` to `next`.
///
/// Returns false when the status no longer matches (already advanced).
pub async fn update_status_cas(
    conn: &mut PgConnection,
    order_id: i64,
    expected: OrderStatus,
    next: OrderStatus,
) -> AppResult<bool> {
    let result = sqlx::query(
        r#"
        UPDATE orders
        SET status = $1
        WHERE id = $2 AND status = $3
        "#,
    )
    .bind(next.as_str())
    .bind(order_id)
    .bind(expected.as_str())
    .execute(conn)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn find_by_id(pool: &PgPool, order_id: i64) -> AppResult<Order> {
    let row = sqlx::query(&format!("{SELECT_ORDER} WHERE id = $1"))
        .bind(order_id)
        .fetch_optional(pool)
        .await?;

    match row {
        Some(row) => row_to_order(&row),
        None => Err(AppError::not_found(format!("order not found: {order_id}"))),
    }
}

/// Same as [`find_by_id`] but inside the caller's transaction.
pub async fn find_by_id_in_tx(conn: &mut PgConnection, order_id: i64) -> AppResult<Order> {
    let row = sqlx::query(&format!("{SELECT_ORDER} WHERE id = $1"))
        .bind(order_id)
        .fetch_optional(conn)
        .await?;

    match row {
        Some(row) => row_to_order(&row),
        None => Err(AppError::not_found(format!("order not found: {order_id}"))),
    }
}

pub async fn list_by_user(pool: &PgPool, user_id: i64) -> AppResult<Vec<Order>> {
    let rows = sqlx::query(&format!(
        "{SELECT_ORDER} WHERE user_id = $1 ORDER BY id DESC"
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    let mut orders = Vec::with_capacity(rows.len());
    for row in rows {
        orders.push(row_to_order(&row)?);
    }
    Ok(orders)
}
