//! Order orchestration
//!
//! The end-to-end purchase use case: validate, reserve under row locks,
//! persist PENDING state plus outbox rows in one transaction, then drive
//! the payment gateway strictly after commit and converge the payment and
//! order onto terminal states through idempotent transitions.

pub mod failure;
pub mod post_commit;
pub mod service;

pub use failure::{FailureKind, classify};
pub use post_commit::{Intent, PostCommitQueue};
pub use service::{CallbackCommand, CreateOrderCommand, OrderDetail, OrderLine, OrderService};
