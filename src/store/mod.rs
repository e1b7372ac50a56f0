//! Persistence layer
//!
//! Repositories over the purchasing tables. All queries are runtime-bound
//! (no compile-time macros) with hand-written row mapping. Functions that
//! participate in the caller's transaction take `&mut PgConnection`;
//! pool-level reads take `&PgPool`.

pub mod coupons;
pub mod likes;
pub mod orders;
pub mod outbox;
pub mod payments;
pub mod products;
pub mod users;

pub use outbox::OutboxRow;
