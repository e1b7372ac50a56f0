//! Product rows: exclusive locking and stock persistence

use sqlx::postgres::PgRow;
use sqlx::{PgConnection, PgPool, Row};

use crate::domain::Product;
use crate::errors::{AppError, AppResult};

fn row_to_product(row: &PgRow) -> Product {
    Product {
        id: row.get("id"),
        name: row.get("name"),
        price: row.get("price"),
        stock: row.get("stock"),
        brand_id: row.get("brand_id"),
    }
}

/// Acquire a row-exclusive hold on a single product.
pub async fn lock_by_id(conn: &mut PgConnection, product_id: i64) -> AppResult<Product> {
    let row = sqlx::query(
        r#"
        SELECT id, name, price, stock, brand_id
        FROM products
        WHERE id = $1
        FOR UPDATE
        "#,
    )
    .bind(product_id)
    .fetch_optional(conn)
    .await?;

    row.map(|r| row_to_product(&r))
        .ok_or_else(|| AppError::not_found(format!("product not found: {product_id}")))
}

/// Persist a new stock level for a product row the caller holds a lock on.
pub async fn update_stock(conn: &mut PgConnection, product_id: i64, stock: i64) -> AppResult<()> {
    let result = sqlx::query("UPDATE products SET stock = $1 WHERE id = $2")
        .bind(stock)
        .bind(product_id)
        .execute(conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found(format!(
            "product not found: id={product_id}"
        )));
    }
    Ok(())
}

/// Insert a product (seeding and tests).
pub async fn insert(
    pool: &PgPool,
    name: &str,
    price: i64,
    stock: i64,
    brand_id: i64,
) -> AppResult<i64> {
    let id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO products (name, price, stock, brand_id)
        VALUES ($1, $2, $3, $4)
        RETURNING id
        "#,
    )
    .bind(name)
    .bind(price)
    .bind(stock)
    .bind(brand_id)
    .fetch_one(pool)
    .await?;

    Ok(id)
}

/// Plain read (no lock) for display paths.
pub async fn find_by_id(pool: &PgPool, product_id: i64) -> AppResult<Product> {
    let row = sqlx::query(
        r#"
        SELECT id, name, price, stock, brand_id
        FROM products
        WHERE id = $1
        "#,
    )
    .bind(product_id)
    .fetch_optional(pool)
    .await?;

    row.map(|r| row_to_product(&r))
        .ok_or_else(|| AppError::not_found(format!("product not found: {product_id}")))
}
