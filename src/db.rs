//! Database access
//!
//! One [`Database`] handle owns the Postgres pool for the whole process.
//! Opening it optionally bootstraps the purchasing schema, so a fresh
//! scratch database is usable straight from config.

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

use crate::config::DatabaseConfig;

/// Handle to the purchasing database.
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Open the pool described by `cfg`. When `cfg.init_schema` is set,
    /// any missing purchasing tables are created before this returns, so
    /// callers never observe a half-initialized database.
    pub async fn open(cfg: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(cfg.max_connections)
            .acquire_timeout(Duration::from_secs(5))
            .connect(&cfg.url)
            .await?;

        let db = Self { pool };
        if cfg.init_schema {
            init_schema(db.pool()).await?;
        }

        tracing::info!(
            max_connections = cfg.max_connections,
            init_schema = cfg.init_schema,
            "orderflow database ready"
        );
        Ok(db)
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// One-round-trip liveness probe backing the health endpoint.
    pub async fn ping(&self) -> Result<(), sqlx::Error> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|_| ())
    }
}

/// Create any missing purchasing tables. Idempotent; runs at startup when
/// `database.init_schema` is set and directly from test harnesses.
pub async fn init_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    tracing::info!("creating missing purchasing tables");

    for ddl in [
        CREATE_BRANDS_TABLE,
        CREATE_USERS_TABLE,
        CREATE_PRODUCTS_TABLE,
        CREATE_LIKES_TABLE,
        CREATE_COUPONS_TABLE,
        CREATE_USER_COUPONS_TABLE,
        CREATE_ORDERS_TABLE,
        CREATE_PAYMENTS_TABLE,
        CREATE_OUTBOX_TABLE,
    ] {
        sqlx::query(ddl).execute(pool).await?;
    }

    Ok(())
}

const CREATE_BRANDS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS brands (
    id          BIGSERIAL PRIMARY KEY,
    name        TEXT NOT NULL
)
"#;

const CREATE_USERS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id          BIGSERIAL PRIMARY KEY,
    external_id TEXT NOT NULL UNIQUE,
    email       TEXT NOT NULL,
    birth_date  DATE,
    gender      TEXT,
    point       BIGINT NOT NULL DEFAULT 0 CHECK (point >= 0)
)
"#;

const CREATE_PRODUCTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS products (
    id          BIGSERIAL PRIMARY KEY,
    name        TEXT NOT NULL,
    price       BIGINT NOT NULL CHECK (price >= 0),
    stock       BIGINT NOT NULL CHECK (stock >= 0),
    brand_id    BIGINT NOT NULL DEFAULT 0
)
"#;

const CREATE_LIKES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS likes (
    user_id     BIGINT NOT NULL,
    product_id  BIGINT NOT NULL,
    created_at  TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    PRIMARY KEY (user_id, product_id)
)
"#;

const CREATE_COUPONS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS coupons (
    code            TEXT PRIMARY KEY,
    discount_type   TEXT NOT NULL,
    value           BIGINT NOT NULL CHECK (value >= 0)
)
"#;

const CREATE_USER_COUPONS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS user_coupons (
    user_id     BIGINT NOT NULL,
    coupon_code TEXT NOT NULL,
    used        BOOLEAN NOT NULL DEFAULT FALSE,
    version     BIGINT NOT NULL DEFAULT 0,
    PRIMARY KEY (user_id, coupon_code)
)
"#;

const CREATE_ORDERS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS orders (
    id              BIGSERIAL PRIMARY KEY,
    user_id         BIGINT NOT NULL,
    status          TEXT NOT NULL,
    total_amount    BIGINT NOT NULL CHECK (total_amount >= 0),
    items           JSONB NOT NULL,
    coupon_code     TEXT,
    discount_amount BIGINT NOT NULL DEFAULT 0,
    created_at      TIMESTAMPTZ NOT NULL DEFAULT NOW()
)
"#;

const CREATE_PAYMENTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS payments (
    id              BIGSERIAL PRIMARY KEY,
    order_id        BIGINT NOT NULL UNIQUE,
    user_id         BIGINT NOT NULL,
    total_amount    BIGINT NOT NULL CHECK (total_amount >= 0),
    used_point      BIGINT NOT NULL CHECK (used_point >= 0),
    paid_amount     BIGINT NOT NULL CHECK (paid_amount >= 0),
    status          TEXT NOT NULL,
    card_type       TEXT,
    card_no         TEXT,
    transaction_key TEXT,
    failure_reason  TEXT,
    pg_requested_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    pg_completed_at TIMESTAMPTZ
)
"#;

const CREATE_OUTBOX_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS outbox_events (
    id              BIGSERIAL PRIMARY KEY,
    aggregate_type  TEXT NOT NULL,
    aggregate_id    BIGINT NOT NULL,
    event_type      TEXT NOT NULL,
    payload         JSONB NOT NULL,
    partition_key   TEXT NOT NULL,
    version         BIGINT NOT NULL,
    created_at      TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    published_at    TIMESTAMPTZ,
    UNIQUE (aggregate_type, aggregate_id, version)
)
"#;
