//! Payment rows
//!
//! Terminal transitions are persisted with a status CAS
//! (`WHERE status = 'PENDING'`), which makes replays and racing writers
//! converge on one winner without a second lock.

use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgConnection, PgPool, Row};
use std::time::Duration;

use crate::domain::{Payment, PaymentStatus};
use crate::errors::{AppError, AppResult};

pub struct NewPayment<'a> {
    pub order_id: i64,
    pub user_id: i64,
    pub total_amount: i64,
    pub used_point: i64,
    pub paid_amount: i64,
    pub status: PaymentStatus,
    pub card_type: Option<&'a str>,
    pub card_no: Option<&'a str>,
}

fn row_to_payment(row: &PgRow) -> AppResult<Payment> {
    let status_str: String = row.get("status");
    let status = PaymentStatus::from_str(&status_str)
        .ok_or_else(|| AppError::internal(format!("invalid payment status: {status_str}")))?;

    Ok(Payment {
        id: row.get("id"),
        order_id: row.get("order_id"),
        user_id: row.get("user_id"),
        total_amount: row.get("total_amount"),
        used_point: row.get("used_point"),
        paid_amount: row.get("paid_amount"),
        status,
        card_type: row.get("card_type"),
        card_no: row.get("card_no"),
        transaction_key: row.get("transaction_key"),
        failure_reason: row.get("failure_reason"),
        pg_requested_at: row.get("pg_requested_at"),
        pg_completed_at: row.get("pg_completed_at"),
    })
}

const SELECT_PAYMENT: &str = r#"
SELECT id, order_id, user_id, total_amount, used_point, paid_amount, status,
       card_type, card_no, transaction_key, failure_reason,
       pg_requested_at, pg_completed_at
FROM payments
"#;

pub async fn insert(conn: &mut PgConnection, new: NewPayment<'_>) -> AppResult<Payment> {
    let completed_at = if new.status.is_terminal() {
        Some(Utc::now())
    } else {
        None
    };

    let row = sqlx::query(
        r#"
        INSERT INTO payments
            (order_id, user_id, total_amount, used_point, paid_amount, status,
             card_type, card_no, pg_requested_at, pg_completed_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, NOW(), $9)
        RETURNING id, order_id, user_id, total_amount, used_point, paid_amount, status,
                  card_type, card_no, transaction_key, failure_reason,
                  pg_requested_at, pg_completed_at
        "#,
    )
    .bind(new.order_id)
    .bind(new.user_id)
    .bind(new.total_amount)
    .bind(new.used_point)
    .bind(new.paid_amount)
    .bind(new.status.as_str())
    .bind(new.card_type)
    .bind(new.card_no)
    .bind(completed_at)
    .fetch_one(conn)
    .await?;

    row_to_payment(&row)
}

pub async fn find_by_order_id(pool: &PgPool, order_id: i64) -> AppResult<Payment> {
    let row = sqlx::query(&format!("{SELECT_PAYMENT} WHERE order_id = $1"))
        .bind(order_id)
        .fetch_optional(pool)
        .await?;

    match row {
        Some(row) => row_to_payment(&row),
        None => Err(AppError::not_found(format!(
            "payment not found for order: {order_id}"
        ))),
    }
}

/// Same as [`find_by_order_id`] but inside the caller's transaction.
pub async fn find_by_order_id_in_tx(
    conn: &mut PgConnection,
    order_id: i64,
) -> AppResult<Payment> {
    let row = sqlx::query(&format!("{SELECT_PAYMENT} WHERE order_id = $1"))
        .bind(order_id)
        .fetch_optional(conn)
        .await?;

    match row {
        Some(row) => row_to_payment(&row),
        None => Err(AppError::not_found(format!(
            "payment not found for order: {order_id}"
        ))),
    }
}

/// Atomic CAS: move a PENDING payment to a terminal state.
///
/// Returns false when the payment already left PENDING.
pub async fn transition_cas(
    conn: &mut PgConnection,
    payment_id: i64,
    next: PaymentStatus,
    transaction_key: Option<&str>,
    failure_reason: Option<&str>,
    completed_at: DateTime<Utc>,
) -> AppResult<bool> {
    let result = sqlx::query(
        r#"
        UPDATE payments
        SET status = $1,
            transaction_key = COALESCE($2, transaction_key),
            failure_reason = COALESCE($3, failure_reason),
            pg_completed_at = $4
        WHERE id = $5 AND status = $6
        "#,
    )
    .bind(next.as_str())
    .bind(transaction_key)
    .bind(failure_reason)
    .bind(completed_at)
    .bind(payment_id)
    .bind(PaymentStatus::Pending.as_str())
    .execute(conn)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// PENDING payments whose gateway request is older than `stale_after`.
///
/// The reconciliation sweep resolves these against the gateway ledger.
pub async fn find_stale_pending(
    pool: &PgPool,
    stale_after: Duration,
    limit: i64,
) -> AppResult<Vec<Payment>> {
    let stale_secs = stale_after.as_secs() as i64;

    let rows = sqlx::query(&format!(
        r#"
        {SELECT_PAYMENT}
        WHERE status = $1
          AND pg_requested_at < NOW() - INTERVAL '1 second' * $2
        ORDER BY pg_requested_at ASC
        LIMIT $3
        "#
    ))
    .bind(PaymentStatus::Pending.as_str())
    .bind(stale_secs)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    let mut payments = Vec::with_capacity(rows.len());
    for row in rows {
        payments.push(row_to_payment(&row)?);
    }
    Ok(payments)
}
